//! Appointment database operations and the local [`AppointmentSyncGateway`].

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::gateway::{AppointmentSyncGateway, GatewayError};
use crate::models::{AppointmentRef, AppointmentStatus};

impl Database {
    /// Insert or update an appointment.
    pub fn upsert_appointment(&self, appointment: &AppointmentRef) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                appointment_id, customer_id, date, time, status, visit_id,
                service_type, service_subtype, other_pest_name, service_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(appointment_id) DO UPDATE SET
                customer_id = excluded.customer_id,
                date = excluded.date,
                time = excluded.time,
                status = excluded.status,
                visit_id = excluded.visit_id,
                service_type = excluded.service_type,
                service_subtype = excluded.service_subtype,
                other_pest_name = excluded.other_pest_name,
                service_price = excluded.service_price,
                updated_at = datetime('now')
            "#,
            params![
                appointment.appointment_id,
                appointment.customer_id,
                appointment.date,
                appointment.time,
                appointment.status.as_str(),
                appointment.visit_id,
                appointment.service_type,
                appointment.service_subtype,
                appointment.other_pest_name,
                appointment.service_price,
            ],
        )?;
        Ok(())
    }

    /// Get an appointment by id.
    pub fn get_appointment(&self, appointment_id: &str) -> DbResult<Option<AppointmentRef>> {
        self.conn
            .query_row(
                r#"
                SELECT appointment_id, customer_id, date, time, status, visit_id,
                       service_type, service_subtype, other_pest_name, service_price
                FROM appointments
                WHERE appointment_id = ?
                "#,
                [appointment_id],
                row_to_appointment,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Appointments for a customer on a date, earliest first.
    pub fn find_appointments(
        &self,
        date: &str,
        customer_id: &str,
    ) -> DbResult<Vec<AppointmentRef>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT appointment_id, customer_id, date, time, status, visit_id,
                   service_type, service_subtype, other_pest_name, service_price
            FROM appointments
            WHERE date = ?1 AND customer_id = ?2
            ORDER BY time ASC
            "#,
        )?;

        let rows = stmt.query_map(params![date, customer_id], row_to_appointment)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?.try_into()?);
        }
        Ok(appointments)
    }

    /// Mark an appointment completed and attach the visit id.
    ///
    /// Idempotent: completing an already-completed appointment succeeds.
    /// Mirrors the backend rule that completion requires a set price.
    pub fn mark_appointment_completed(
        &self,
        appointment_id: &str,
        visit_id: &str,
    ) -> DbResult<()> {
        let row: Option<(String, Option<f64>)> = self
            .conn
            .query_row(
                "SELECT status, service_price FROM appointments WHERE appointment_id = ?",
                [appointment_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((status, price)) = row else {
            return Err(DbError::NotFound(format!(
                "appointment {appointment_id}"
            )));
        };

        if price.is_none() {
            return Err(DbError::Constraint("Service price must be set".into()));
        }

        if status == AppointmentStatus::Completed.as_str() {
            // Already completed; keep the visit id current and return.
            self.conn.execute(
                "UPDATE appointments SET visit_id = ?2, updated_at = datetime('now')
                 WHERE appointment_id = ?1",
                params![appointment_id, visit_id],
            )?;
            return Ok(());
        }

        self.conn.execute(
            r#"
            UPDATE appointments SET
                status = 'completed',
                visit_id = ?2,
                updated_at = datetime('now')
            WHERE appointment_id = ?1
            "#,
            params![appointment_id, visit_id],
        )?;
        Ok(())
    }
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    appointment_id: String,
    customer_id: String,
    date: String,
    time: Option<String>,
    status: String,
    visit_id: Option<String>,
    service_type: Option<String>,
    service_subtype: Option<String>,
    other_pest_name: Option<String>,
    service_price: Option<f64>,
}

fn row_to_appointment(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        appointment_id: row.get(0)?,
        customer_id: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        status: row.get(4)?,
        visit_id: row.get(5)?,
        service_type: row.get(6)?,
        service_subtype: row.get(7)?,
        other_pest_name: row.get(8)?,
        service_price: row.get(9)?,
    })
}

impl TryFrom<AppointmentRow> for AppointmentRef {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown appointment status: {}", row.status))
        })?;

        Ok(AppointmentRef {
            appointment_id: row.appointment_id,
            customer_id: row.customer_id,
            date: row.date,
            time: row.time,
            status,
            visit_id: row.visit_id,
            service_type: row.service_type,
            service_subtype: row.service_subtype,
            other_pest_name: row.other_pest_name,
            service_price: row.service_price,
        })
    }
}

/// [`AppointmentSyncGateway`] backed by the local database.
pub struct LocalAppointmentGateway<'a> {
    db: &'a Database,
}

impl<'a> LocalAppointmentGateway<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }
}

impl AppointmentSyncGateway for LocalAppointmentGateway<'_> {
    fn mark_completed(&self, appointment_id: &str, visit_id: &str) -> Result<(), GatewayError> {
        self.db
            .mark_appointment_completed(appointment_id, visit_id)
            .map_err(|e| match e {
                DbError::Constraint(message) => GatewayError::Rejected(message),
                DbError::NotFound(what) => GatewayError::Rejected(format!("not found: {what}")),
                other => GatewayError::Transport(other.to_string()),
            })
    }

    fn find_by_date_and_customer(
        &self,
        date: &str,
        customer_id: &str,
    ) -> Result<Vec<AppointmentRef>, GatewayError> {
        self.db
            .find_appointments(date, customer_id)
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_appointment(id: &str, price: Option<f64>) -> AppointmentRef {
        AppointmentRef {
            appointment_id: id.into(),
            customer_id: "cust-1".into(),
            date: "2026-08-20".into(),
            time: Some("09:30".into()),
            status: AppointmentStatus::Scheduled,
            visit_id: None,
            service_type: Some("insecticide".into()),
            service_subtype: None,
            other_pest_name: None,
            service_price: price,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let appointment = make_appointment("apt-1", Some(120.0));
        db.upsert_appointment(&appointment).unwrap();

        let loaded = db.get_appointment("apt-1").unwrap().unwrap();
        assert_eq!(loaded, appointment);
    }

    #[test]
    fn test_find_by_date_and_customer_ordered_by_time() {
        let db = Database::open_in_memory().unwrap();
        let mut late = make_appointment("apt-late", None);
        late.time = Some("15:00".into());
        let mut early = make_appointment("apt-early", None);
        early.time = Some("08:00".into());
        db.upsert_appointment(&late).unwrap();
        db.upsert_appointment(&early).unwrap();

        let found = db.find_appointments("2026-08-20", "cust-1").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].appointment_id, "apt-early");
        assert_eq!(found[1].appointment_id, "apt-late");

        assert!(db.find_appointments("2026-08-21", "cust-1").unwrap().is_empty());
    }

    #[test]
    fn test_mark_completed_requires_price() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_appointment(&make_appointment("apt-1", None)).unwrap();

        let err = db.mark_appointment_completed("apt-1", "V1").unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));

        let gateway = LocalAppointmentGateway::new(&db);
        let err = gateway.mark_completed("apt-1", "V1").unwrap_err();
        assert!(err.is_price_not_set());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_appointment(&make_appointment("apt-1", Some(90.0))).unwrap();

        db.mark_appointment_completed("apt-1", "V1").unwrap();
        db.mark_appointment_completed("apt-1", "V1").unwrap();

        let loaded = db.get_appointment("apt-1").unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Completed);
        assert_eq!(loaded.visit_id.as_deref(), Some("V1"));
    }

    #[test]
    fn test_mark_completed_unknown_appointment() {
        let db = Database::open_in_memory().unwrap();
        let err = db.mark_appointment_completed("nope", "V1").unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
