use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Constraint, ConstraintTarget, NewConstraintData};
use crate::repository::{decode_json, encode_json, SqliteRepository};

use super::ConstraintRepository;

fn decompose(constraint: &Constraint) -> (&'static str, &ConstraintTarget, &ConstraintTarget) {
    match constraint {
        Constraint::NoOverlap { a, b } => ("no_overlap", a, b),
        Constraint::MustBeBefore { first, second } => ("must_be_before", first, second),
        Constraint::Chain { parent, child } => ("chain", parent, child),
    }
}

fn recompose(kind: &str, a: ConstraintTarget, b: ConstraintTarget) -> Result<Constraint, CoreError> {
    match kind {
        "no_overlap" => Ok(Constraint::NoOverlap { a, b }),
        "must_be_before" => Ok(Constraint::MustBeBefore { first: a, second: b }),
        "chain" => Ok(Constraint::Chain { parent: a, child: b }),
        other => Err(CoreError::InvalidData(format!("unknown constraint kind: {other}"))),
    }
}

#[async_trait]
impl ConstraintRepository for SqliteRepository {
    async fn add_constraint(&self, data: NewConstraintData) -> Result<Uuid, CoreError> {
        let id = Uuid::now_v7();
        let (kind, a, b) = decompose(&data.constraint);
        sqlx::query("INSERT INTO constraints (id, kind, a_json, b_json) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(kind)
            .bind(encode_json(a))
            .bind(encode_json(b))
            .execute(self.pool())
            .await?;
        Ok(id)
    }

    async fn remove_constraint(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM constraints WHERE id = ?").bind(id).execute(self.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_constraints(&self) -> Result<Vec<Constraint>, CoreError> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT kind, a_json, b_json FROM constraints ORDER BY id")
                .fetch_all(self.pool())
                .await?;

        rows.into_iter()
            .map(|(kind, a_json, b_json)| {
                let a: ConstraintTarget = decode_json(Some(a_json.as_str()), "constraint.a")?
                    .ok_or_else(|| CoreError::InvalidData("constraint row missing a_json".into()))?;
                let b: ConstraintTarget = decode_json(Some(b_json.as_str()), "constraint.b")?
                    .ok_or_else(|| CoreError::InvalidData("constraint row missing b_json".into()))?;
                recompose(&kind, a, b)
            })
            .collect()
    }
}
