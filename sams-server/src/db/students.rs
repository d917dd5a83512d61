//! Student registry persistence
//!
//! Descriptors are stored as a JSON array of arrays in one column.

use super::{parse_guid, parse_timestamp};
use sams_common::db::{Descriptor, Student, StudentStatus};
use sams_common::{Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

const STUDENT_COLUMNS: &str = "guid, student_id, name, class_name, guardian_name, status, \
                               descriptors, created_at, updated_at";

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    let guid: String = row.get("guid");
    let status: String = row.get("status");
    let descriptors: String = row.get("descriptors");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Student {
        guid: parse_guid(&guid)?,
        student_id: row.get("student_id"),
        name: row.get("name"),
        class_name: row.get("class_name"),
        guardian_name: row.get("guardian_name"),
        status: status.parse::<StudentStatus>().map_err(Error::Internal)?,
        descriptors: serde_json::from_str(&descriptors)
            .map_err(|e| Error::Internal(format!("Failed to deserialize descriptors: {}", e)))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn descriptors_json(descriptors: &[Descriptor]) -> Result<String> {
    serde_json::to_string(descriptors)
        .map_err(|e| Error::Internal(format!("Failed to serialize descriptors: {}", e)))
}

/// Insert a new student
///
/// Returns `false` if an active student already holds the same ID
/// (case-insensitive), per the partial unique index.
pub async fn insert_student(pool: &SqlitePool, student: &Student) -> Result<bool> {
    let descriptors = descriptors_json(&student.descriptors)?;

    let result = sqlx::query(
        r#"
        INSERT INTO students (
            guid, student_id, name, class_name, guardian_name, status,
            descriptors, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(student.guid.to_string())
    .bind(&student.student_id)
    .bind(&student.name)
    .bind(&student.class_name)
    .bind(&student.guardian_name)
    .bind(student.status.as_str())
    .bind(descriptors)
    .bind(student.created_at.to_rfc3339())
    .bind(student.updated_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
        Err(e) => Err(Error::Database(e)),
    }
}

/// List students in enrollment order
///
/// The order is stable so matcher tie-breaks are reproducible.
pub async fn list_students(pool: &SqlitePool, active_only: bool) -> Result<Vec<Student>> {
    let sql = if active_only {
        format!(
            "SELECT {} FROM students WHERE status = 'active' ORDER BY created_at, rowid",
            STUDENT_COLUMNS
        )
    } else {
        format!("SELECT {} FROM students ORDER BY created_at, rowid", STUDENT_COLUMNS)
    };

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(student_from_row).collect()
}

/// Find a student by school ID (case-insensitive)
///
/// Prefers the active student; otherwise the most recently updated inactive one.
pub async fn find_by_student_id(pool: &SqlitePool, student_id: &str) -> Result<Option<Student>> {
    let sql = format!(
        "SELECT {} FROM students WHERE student_id = ? COLLATE NOCASE
         ORDER BY (status = 'active') DESC, updated_at DESC
         LIMIT 1",
        STUDENT_COLUMNS
    );

    let row = sqlx::query(&sql)
        .bind(student_id.trim())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(student_from_row).transpose()
}

pub async fn find_by_guid(pool: &SqlitePool, guid: Uuid) -> Result<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE guid = ?", STUDENT_COLUMNS);

    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(student_from_row).transpose()
}

/// Append a reference descriptor to a student
pub async fn add_descriptor(pool: &SqlitePool, guid: Uuid, descriptor: Descriptor) -> Result<Student> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM students WHERE guid = ?", STUDENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Student {}", guid)))?;

    let mut student = student_from_row(&row)?;
    student.descriptors.push(descriptor);
    student.updated_at = sams_common::time::now();

    sqlx::query("UPDATE students SET descriptors = ?, updated_at = ? WHERE guid = ?")
        .bind(descriptors_json(&student.descriptors)?)
        .bind(student.updated_at.to_rfc3339())
        .bind(guid.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(student)
}

/// Mark a student inactive
///
/// Returns `false` if the student was not active.
pub async fn deactivate(pool: &SqlitePool, guid: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE students SET status = 'inactive', updated_at = ? WHERE guid = ? AND status = 'active'",
    )
    .bind(sams_common::time::now().to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of active students
pub async fn count_active(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE status = 'active'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sams_common::db::{init_database, DESCRIPTOR_LEN};

    async fn setup() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("sams.db")).await.unwrap();
        (dir, pool)
    }

    fn student(id: &str) -> Student {
        let now = sams_common::time::now();
        Student {
            guid: Uuid::new_v4(),
            student_id: id.to_string(),
            name: format!("Student {}", id),
            class_name: "5A".to_string(),
            guardian_name: "Guardian".to_string(),
            status: StudentStatus::Active,
            descriptors: vec![vec![0.5; DESCRIPTOR_LEN]],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (_dir, pool) = setup().await;
        let s = student("S001");
        assert!(insert_student(&pool, &s).await.unwrap());

        let found = find_by_student_id(&pool, "s001").await.unwrap().unwrap();
        assert_eq!(found.guid, s.guid);
        assert_eq!(found.descriptors, s.descriptors);
        assert!(find_by_student_id(&pool, "S999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_id_is_unique_case_insensitive() {
        let (_dir, pool) = setup().await;
        assert!(insert_student(&pool, &student("S001")).await.unwrap());
        assert!(!insert_student(&pool, &student("s001")).await.unwrap());
    }

    #[tokio::test]
    async fn test_inactive_id_can_be_reused() {
        let (_dir, pool) = setup().await;
        let old = student("S001");
        insert_student(&pool, &old).await.unwrap();
        assert!(deactivate(&pool, old.guid).await.unwrap());
        assert!(!deactivate(&pool, old.guid).await.unwrap());

        let new = student("S001");
        assert!(insert_student(&pool, &new).await.unwrap());

        let found = find_by_student_id(&pool, "S001").await.unwrap().unwrap();
        assert_eq!(found.guid, new.guid);
        assert_eq!(count_active(&pool).await.unwrap(), 1);
        assert_eq!(list_students(&pool, false).await.unwrap().len(), 2);
        assert_eq!(list_students(&pool, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_order_is_enrollment_order() {
        let (_dir, pool) = setup().await;
        for id in ["S003", "S001", "S002"] {
            insert_student(&pool, &student(id)).await.unwrap();
        }

        let ids: Vec<String> = list_students(&pool, true)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(ids, vec!["S003", "S001", "S002"]);
    }

    #[tokio::test]
    async fn test_add_descriptor() {
        let (_dir, pool) = setup().await;
        let s = student("S001");
        insert_student(&pool, &s).await.unwrap();

        let updated = add_descriptor(&pool, s.guid, vec![0.1; DESCRIPTOR_LEN])
            .await
            .unwrap();
        assert_eq!(updated.descriptors.len(), 2);

        let found = find_by_student_id(&pool, "S001").await.unwrap().unwrap();
        assert_eq!(found.descriptors.len(), 2);

        let missing = add_descriptor(&pool, Uuid::new_v4(), vec![0.1; DESCRIPTOR_LEN]).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
