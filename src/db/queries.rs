use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::models::{
    BlockedSlot, Booking, BookingStatus, ChatMessage, Role, ScheduleEntry, ServiceName, User,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, provider_id, client_id, client_name, client_email, service_id, service_name, date, time, status, note, created_at, updated_at";

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Bookings ──

/// Inserts a booking. Returns `Ok(false)` when another live booking already
/// holds the same provider/date/time slot.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let service_name = booking
        .service_name
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = conn.execute(
        "INSERT INTO bookings (id, provider_id, client_id, client_name, client_email, service_id, service_name, date, time, status, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.provider_id,
            booking.client_id,
            booking.client_name,
            booking.client_email,
            booking.service_id,
            service_name,
            booking.date,
            booking.time,
            booking.status.as_str(),
            booking.note,
            format_ts(&booking.created_at),
            format_ts(&booking.updated_at),
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// The booking currently holding `provider_id`/`date`/`time`, if any.
pub fn find_active_booking(
    conn: &Connection,
    provider_id: &str,
    date: &str,
    time: &str,
) -> anyhow::Result<Option<Booking>> {
    let result = conn
        .query_row(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE provider_id = ?1 AND date = ?2 AND time = ?3
                   AND status NOT IN ('rejected', 'cancelled')"
            ),
            params![provider_id, date, time],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn get_bookings_for_provider(
    conn: &Connection,
    provider_id: &str,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE provider_id = ?1 ORDER BY date ASC, time ASC"
        ),
        params![provider_id],
    )
}

pub fn get_bookings_for_provider_on(
    conn: &Connection,
    provider_id: &str,
    date: &str,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE provider_id = ?1 AND date = ?2 ORDER BY time ASC"
        ),
        params![provider_id, date],
    )
}

pub fn get_bookings_for_client(conn: &Connection, email: &str) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE client_email = ?1 ORDER BY date ASC, time ASC"
        ),
        params![email],
    )
}

pub fn get_bookings_with_status(
    conn: &Connection,
    status: &BookingStatus,
) -> anyhow::Result<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY date ASC, time ASC"
        ),
        params![status.as_str()],
    )
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    match status_filter {
        Some(status) => query_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY date DESC, time DESC LIMIT ?2"
            ),
            params![status.as_str(), limit],
        ),
        None => query_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY date DESC, time DESC LIMIT ?1"
            ),
            params![limit],
        ),
    }
}

/// Compare-and-set status change: only applies when the row is still in
/// `from`. Returns whether a row changed.
pub fn transition_booking_status(
    conn: &Connection,
    id: &str,
    from: &BookingStatus,
    to: &BookingStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), format_ts(now), id, from.as_str()],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let service_name: Option<String> = row.get(6)?;
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status in database: {status_str}"))?;
    let service_name = service_name.and_then(|s| serde_json::from_str::<ServiceName>(&s).ok());

    Ok(Booking {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        client_id: row.get(2)?,
        client_name: row.get(3)?,
        client_email: row.get(4)?,
        service_id: row.get(5)?,
        service_name,
        date: row.get(7)?,
        time: row.get(8)?,
        status,
        note: row.get(10)?,
        created_at: parse_ts(&created_at_str),
        updated_at: parse_ts(&updated_at_str),
    })
}

// ── Users / providers ──

const USER_COLUMNS: &str = "id, name, email, role, is_special, earnings, schedule, blocked_slots";

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            |row| Ok(parse_user_row(row)),
        )
        .optional()?;

    result.transpose()
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    query_users(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, rowid ASC"),
    )
}

pub fn list_providers(conn: &Connection) -> anyhow::Result<Vec<User>> {
    query_users(
        conn,
        &format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'provider' ORDER BY created_at ASC, rowid ASC"
        ),
    )
}

fn query_users(conn: &Connection, sql: &str) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

/// Creates or updates a user's profile fields. Earnings are never written here.
pub fn save_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    let schedule = serde_json::to_string(&user.schedule)?;
    let blocked_slots = serde_json::to_string(&user.blocked_slots)?;

    conn.execute(
        "INSERT INTO users (id, name, email, role, is_special, schedule, blocked_slots)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           email = excluded.email,
           role = excluded.role,
           is_special = excluded.is_special,
           schedule = excluded.schedule,
           blocked_slots = excluded.blocked_slots,
           updated_at = datetime('now')",
        params![
            user.id,
            user.name,
            user.email,
            user.role.as_str(),
            user.is_special as i32,
            schedule,
            blocked_slots,
        ],
    )?;
    Ok(())
}

/// Replaces whichever of the two availability fields is given.
pub fn update_schedule(
    conn: &Connection,
    id: &str,
    schedule: Option<&[ScheduleEntry]>,
    blocked_slots: Option<&[BlockedSlot]>,
) -> anyhow::Result<bool> {
    let schedule = schedule.map(serde_json::to_string).transpose()?;
    let blocked_slots = blocked_slots.map(serde_json::to_string).transpose()?;

    let count = conn.execute(
        "UPDATE users SET
           schedule = COALESCE(?2, schedule),
           blocked_slots = COALESCE(?3, blocked_slots),
           updated_at = datetime('now')
         WHERE id = ?1",
        params![id, schedule, blocked_slots],
    )?;
    Ok(count > 0)
}

pub fn credit_earnings(conn: &Connection, id: &str, amount: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET earnings = earnings + ?1 WHERE id = ?2",
        params![amount, id],
    )?;
    Ok(count > 0)
}

/// Credits `amount` to every special-tier provider. Returns how many were credited.
pub fn credit_special_providers(conn: &Connection, amount: i64) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE users SET earnings = earnings + ?1 WHERE role = 'provider' AND is_special = 1",
        params![amount],
    )?;
    Ok(count)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(3)?;
    let schedule_json: String = row.get(6)?;
    let blocked_json: String = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: Role::parse(&role_str),
        is_special: row.get::<_, i32>(4)? != 0,
        earnings: row.get(5)?,
        schedule: serde_json::from_str(&schedule_json).unwrap_or_default(),
        blocked_slots: serde_json::from_str(&blocked_json).unwrap_or_default(),
    })
}

// ── Chat messages ──

pub fn insert_message(conn: &Connection, message: &ChatMessage) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO messages (id, booking_id, sender_id, sender_name, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.id,
            message.booking_id,
            message.sender_id,
            message.sender_name,
            message.text,
            format_ts(&message.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_messages_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, sender_id, sender_name, text, created_at
         FROM messages WHERE booking_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        let created_at: String = row.get(5)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            sender_id: row.get(2)?,
            sender_name: row.get(3)?,
            text: row.get(4)?,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

pub fn delete_messages_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM messages WHERE booking_id = ?1",
        params![booking_id],
    )?;
    Ok(count)
}
