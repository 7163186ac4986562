use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingDetails, BookingKind, BookingStatus, Contact, FormStatus, FormType,
    Notification, User,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, user_id, status, date, contact_name, contact_phone, contact_email, \
     documents, payment_confirmed, rejection_reason, details, created_at, updated_at";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let documents = serde_json::to_string(&booking.documents)?;
    let details = serde_json::to_string(&booking.details)?;

    conn.execute(
        "INSERT INTO bookings (id, kind, user_id, status, date, contact_name, contact_phone, contact_email,
                               documents, payment_confirmed, rejection_reason, details, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.kind().as_str(),
            booking.user_id,
            booking.status.as_str(),
            booking.date.format(DATE_FORMAT).to_string(),
            booking.contact.name,
            booking.contact.phone,
            booking.contact.email,
            documents,
            booking.payment_confirmed as i32,
            booking.rejection_reason,
            details,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of an existing booking.
pub fn save_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let documents = serde_json::to_string(&booking.documents)?;
    let details = serde_json::to_string(&booking.details)?;

    let count = conn.execute(
        "UPDATE bookings SET status = ?1, date = ?2, contact_name = ?3, contact_phone = ?4,
                contact_email = ?5, documents = ?6, payment_confirmed = ?7, rejection_reason = ?8,
                details = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            booking.status.as_str(),
            booking.date.format(DATE_FORMAT).to_string(),
            booking.contact.name,
            booking.contact.phone,
            booking.contact.email,
            documents,
            booking.payment_confirmed as i32,
            booking.rejection_reason,
            details,
            booking.updated_at.format(TS_FORMAT).to_string(),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;

    result.transpose()
}

pub fn list_bookings(
    conn: &Connection,
    kind: Option<BookingKind>,
    status: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR kind = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC, id ASC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![kind.map(|k| k.as_str()), status.map(|s| s.as_str()), limit],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings_for_user(
    conn: &Connection,
    user_id: &str,
    kind: BookingKind,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE user_id = ?1 AND kind = ?2 ORDER BY date ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, kind.as_str()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Bookings of a kind dated on or after `from`, excluding rejected ones.
pub fn list_calendar_bookings(
    conn: &Connection,
    kind: BookingKind,
    from: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE kind = ?1 AND date >= ?2 AND status != 'rejected' ORDER BY date ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![kind.as_str(), from.format(DATE_FORMAT).to_string()],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// `(kind, status, count)` for every combination that has at least one row.
pub fn booking_counts(conn: &Connection) -> anyhow::Result<Vec<(String, String, i64)>> {
    let mut stmt =
        conn.prepare("SELECT kind, status, COUNT(*) FROM bookings GROUP BY kind, status")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

    let mut counts = vec![];
    for row in rows {
        counts.push(row?);
    }
    Ok(counts)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let user_id: Option<String> = row.get(1)?;
    let status_str: String = row.get(2)?;
    let date_str: String = row.get(3)?;
    let contact_name: String = row.get(4)?;
    let contact_phone: String = row.get(5)?;
    let contact_email: Option<String> = row.get(6)?;
    let documents_json: String = row.get(7)?;
    let payment_confirmed: bool = row.get::<_, i32>(8)? != 0;
    let rejection_reason: Option<String> = row.get(9)?;
    let details_json: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("booking {id} has unknown status {status_str}"))?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?;
    let details: BookingDetails = serde_json::from_str(&details_json)?;
    let documents: Vec<String> = serde_json::from_str(&documents_json).unwrap_or_default();

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TS_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TS_FORMAT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        user_id,
        status,
        date,
        contact: Contact {
            name: contact_name,
            phone: contact_phone,
            email: contact_email,
        },
        documents,
        payment_confirmed,
        rejection_reason,
        details,
        created_at,
        updated_at,
    })
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.name,
            user.email,
            user.password_hash,
            user.is_admin as i32,
            user.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, password_hash, is_admin, created_at
             FROM users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, password_hash, is_admin, created_at
             FROM users WHERE id = ?1",
            params![id],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn set_user_admin(conn: &Connection, id: &str, is_admin: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET is_admin = ?1 WHERE id = ?2",
        params![is_admin as i32, id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_admin: row.get::<_, i32>(4)? != 0,
        created_at: row.get(5)?,
    })
}

// ── Notifications ──

pub fn insert_notification(
    conn: &Connection,
    user_id: Option<&str>,
    form_type: FormType,
    message: &str,
) -> anyhow::Result<Notification> {
    let created_at = now_str();
    conn.execute(
        "INSERT INTO notifications (user_id, form_type, message, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, form_type.as_str(), message, created_at],
    )?;

    Ok(Notification {
        id: conn.last_insert_rowid(),
        user_id: user_id.map(str::to_string),
        form_type,
        message: message.to_string(),
        is_read: false,
        created_at,
    })
}

/// Selects a notification with `is_read` computed for the user bound to `?1`.
const NOTIFICATION_SELECT: &str = "SELECT n.id, n.user_id, n.form_type, n.message,
        EXISTS (SELECT 1 FROM notification_reads r
                WHERE r.notification_id = n.id AND r.user_id = ?1),
        n.created_at
     FROM notifications n";

/// The user's own notifications plus broadcasts, newest first.
pub fn list_notifications_for_user(
    conn: &Connection,
    user_id: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTIFICATION_SELECT}
         WHERE n.user_id IS NULL OR n.user_id = ?1
         ORDER BY n.id DESC LIMIT ?2"
    ))?;

    let rows = stmt.query_map(params![user_id, limit], |row| Ok(parse_notification_row(row)))?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

pub fn get_notifications_since(
    conn: &Connection,
    user_id: Option<&str>,
    since_id: i64,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTIFICATION_SELECT}
         WHERE n.id > ?2 AND (n.user_id IS NULL OR n.user_id = ?1)
         ORDER BY n.id ASC"
    ))?;

    let rows = stmt.query_map(params![user_id, since_id], |row| {
        Ok(parse_notification_row(row))
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

/// Marks a notification read for one user. Returns false when the
/// notification does not exist or is addressed to someone else.
pub fn mark_notification_read(conn: &Connection, user_id: &str, id: i64) -> anyhow::Result<bool> {
    let visible: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM notifications
         WHERE id = ?1 AND (user_id IS NULL OR user_id = ?2)",
        params![id, user_id],
        |row| row.get(0),
    )?;
    if !visible {
        return Ok(false);
    }

    conn.execute(
        "INSERT OR IGNORE INTO notification_reads (notification_id, user_id) VALUES (?1, ?2)",
        params![id, user_id],
    )?;
    Ok(true)
}

/// Notification deliveries not yet read: each private notification counts
/// once for its owner, each broadcast once per registered user.
pub fn count_unread_deliveries(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications n
         JOIN users u ON n.user_id IS NULL OR n.user_id = u.id
         WHERE NOT EXISTS (SELECT 1 FROM notification_reads r
                           WHERE r.notification_id = n.id AND r.user_id = u.id)",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn parse_notification_row(row: &rusqlite::Row) -> anyhow::Result<Notification> {
    let form_str: String = row.get(2)?;
    let form_type = FormType::parse(&form_str)
        .ok_or_else(|| anyhow::anyhow!("unknown form type {form_str}"))?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        form_type,
        message: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// ── Form Status ──

pub fn get_form_statuses(conn: &Connection) -> anyhow::Result<Vec<FormStatus>> {
    let mut stmt =
        conn.prepare("SELECT form_type, is_active, updated_at FROM form_status ORDER BY form_type")?;
    let rows = stmt.query_map([], |row| {
        let form_str: String = row.get(0)?;
        Ok((form_str, row.get::<_, i32>(1)? != 0, row.get::<_, String>(2)?))
    })?;

    let mut statuses = vec![];
    for row in rows {
        let (form_str, is_active, updated_at) = row?;
        // Rows for forms this build no longer knows about are skipped.
        if let Some(form_type) = FormType::parse(&form_str) {
            statuses.push(FormStatus {
                form_type,
                is_active,
                updated_at,
            });
        }
    }
    Ok(statuses)
}

pub fn is_form_active(conn: &Connection, form_type: FormType) -> anyhow::Result<bool> {
    let active = conn
        .query_row(
            "SELECT is_active FROM form_status WHERE form_type = ?1",
            params![form_type.as_str()],
            |row| row.get::<_, i32>(0),
        )
        .optional()?;
    Ok(active.unwrap_or(0) != 0)
}

/// Sets a form's state and returns the state it had before.
pub fn set_form_status(
    conn: &Connection,
    form_type: FormType,
    is_active: bool,
) -> anyhow::Result<bool> {
    let was_active = is_form_active(conn, form_type)?;
    conn.execute(
        "INSERT INTO form_status (form_type, is_active, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(form_type) DO UPDATE SET is_active = excluded.is_active, updated_at = excluded.updated_at",
        params![form_type.as_str(), is_active as i32, now_str()],
    )?;
    Ok(was_active)
}
