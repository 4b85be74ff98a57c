use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const STAMP: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Renders one appointment as a minimal iCalendar document: UTC stamps in
/// basic format, CRLF line endings.
pub fn render_ics(
    start_at: OffsetDateTime,
    end_at: OffsetDateTime,
    customer_name: &str,
    customer_phone: &str,
) -> Result<String, time::error::Format> {
    let dtstart = start_at.to_offset(UtcOffset::UTC).format(STAMP)?;
    let dtend = end_at.to_offset(UtcOffset::UTC).format(STAMP)?;
    Ok([
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("DTSTART:{}", dtstart),
        format!("DTEND:{}", dtend),
        format!("SUMMARY:Appointment - {}", customer_name),
        format!("DESCRIPTION:Phone: {}", customer_phone),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ]
    .join("\r\n"))
}
