//! Read-only aggregates for the workspace dashboard.
//!
//! Everything is counted from current task rows at request time.

use std::collections::HashMap;

use sqlx::PgPool;
use taskdeck_core::stats::TaskStats;
use taskdeck_core::task::TaskStatus;
use taskdeck_core::types::DbId;

use crate::models::dashboard::{AssigneeLoad, ProjectSummary};
use crate::repositories::task_repo::stats_from_rows;
use crate::repositories::ProjectRepo;

pub struct DashboardRepo;

impl DashboardRepo {
    /// Status breakdown across every project in the workspace.
    pub async fn workspace_stats(pool: &PgPool, workspace_id: DbId) -> Result<TaskStats, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT t.status, COUNT(*)
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             WHERE p.workspace_id = $1
             GROUP BY t.status",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;
        Ok(stats_from_rows(rows))
    }

    /// One summary per project (including empty ones), by project name.
    pub async fn project_summaries(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        let projects = ProjectRepo::list(pool, workspace_id, None).await?;

        let rows: Vec<(DbId, String, i64)> = sqlx::query_as(
            "SELECT t.project_id, t.status, COUNT(*)
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             WHERE p.workspace_id = $1
             GROUP BY t.project_id, t.status",
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        let mut counts: HashMap<DbId, Vec<(TaskStatus, i64)>> = HashMap::new();
        for (project_id, status, count) in rows {
            if let Ok(status) = status.parse::<TaskStatus>() {
                counts.entry(project_id).or_default().push((status, count));
            }
        }

        Ok(projects
            .into_iter()
            .map(|p| ProjectSummary {
                stats: TaskStats::from_counts(counts.remove(&p.id).unwrap_or_default()),
                project_id: p.id,
                name: p.name,
                key: p.key,
                color: p.color,
                status: p.status,
            })
            .collect())
    }

    /// Open and completed task counts per assignee, busiest first.
    /// Unassigned tasks appear as a row with `user_id = None`.
    pub async fn tasks_by_assignee(
        pool: &PgPool,
        workspace_id: DbId,
    ) -> Result<Vec<AssigneeLoad>, sqlx::Error> {
        sqlx::query_as::<_, AssigneeLoad>(
            "SELECT t.assignee_id AS user_id,
                    u.name,
                    COUNT(*) FILTER (WHERE t.status <> $2) AS open_tasks,
                    COUNT(*) FILTER (WHERE t.status = $2) AS completed_tasks
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             LEFT JOIN users u ON u.id = t.assignee_id
             WHERE p.workspace_id = $1
             GROUP BY t.assignee_id, u.name
             ORDER BY open_tasks DESC, u.name NULLS LAST",
        )
        .bind(workspace_id)
        .bind(TaskStatus::Done.as_str())
        .fetch_all(pool)
        .await
    }
}
