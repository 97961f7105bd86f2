//! Service log database operations and the local [`ServiceLogGateway`].

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::gateway::{GatewayError, SaveReceipt, ServiceLogGateway, WireServiceLog};
use crate::models::ServiceVisitRecord;

impl Database {
    /// Insert or overwrite a service log under its stable `log_id`.
    pub fn upsert_service_log(&self, record: &ServiceVisitRecord) -> DbResult<()> {
        let record_json = serde_json::to_string(&WireServiceLog::from(record))?;

        self.conn.execute(
            r#"
            INSERT INTO service_logs (
                log_id, visit_id, customer_id, technician_id, service_type, record
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(log_id) DO UPDATE SET
                visit_id = excluded.visit_id,
                customer_id = excluded.customer_id,
                technician_id = excluded.technician_id,
                service_type = excluded.service_type,
                record = excluded.record,
                updated_at = datetime('now')
            "#,
            params![
                record.log_id,
                record.visit_id,
                record.customer_id,
                record.technician_id,
                record.service_type,
                record_json,
            ],
        )?;
        Ok(())
    }

    /// Get a service log by its server-issued visit id.
    pub fn get_service_log_by_visit_id(
        &self,
        visit_id: &str,
    ) -> DbResult<Option<ServiceVisitRecord>> {
        let row: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM service_logs WHERE visit_id = ?",
                [visit_id],
                |row| row.get(0),
            )
            .optional()?;

        row.map(|json| decode_record(&json)).transpose()
    }

    /// Get a service log by its record key.
    pub fn get_service_log(&self, log_id: &str) -> DbResult<Option<ServiceVisitRecord>> {
        let row: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM service_logs WHERE log_id = ?",
                [log_id],
                |row| row.get(0),
            )
            .optional()?;

        row.map(|json| decode_record(&json)).transpose()
    }

    /// All service logs for a customer, newest first.
    pub fn list_service_logs_for_customer(
        &self,
        customer_id: &str,
    ) -> DbResult<Vec<ServiceVisitRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT record FROM service_logs
            WHERE customer_id = ?
            ORDER BY updated_at DESC
            "#,
        )?;

        let rows = stmt.query_map([customer_id], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_record(&row?)?);
        }
        Ok(records)
    }
}

/// Decode a stored row, tolerating both historical field spellings.
fn decode_record(json: &str) -> DbResult<ServiceVisitRecord> {
    let wire: WireServiceLog = serde_json::from_str(json)?;
    Ok(wire.into_record())
}

/// [`ServiceLogGateway`] backed by the local database.
pub struct LocalServiceLogGateway<'a> {
    db: &'a Database,
}

impl<'a> LocalServiceLogGateway<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl ServiceLogGateway for LocalServiceLogGateway<'_> {
    fn get_by_visit_id(&self, visit_id: &str) -> Result<Option<ServiceVisitRecord>, GatewayError> {
        self.db
            .get_service_log_by_visit_id(visit_id)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    fn save(&self, record: &ServiceVisitRecord) -> Result<SaveReceipt, GatewayError> {
        self.db
            .upsert_service_log(record)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(SaveReceipt {
            log_id: record.log_id.clone(),
        })
    }
}
