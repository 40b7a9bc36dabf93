pub mod http;
pub mod log;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Booking, BookingStatus};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> anyhow::Result<()>;
}

fn service_label(booking: &Booking) -> &str {
    booking
        .service_name
        .as_ref()
        .map(|s| s.display())
        .filter(|s| !s.is_empty())
        .unwrap_or("Spiritual Session")
}

/// Mails sent when a client requests a booking: a receipt to the client, a
/// request to the provider when they have an address on file and, when
/// configured, a heads-up to the admin inbox.
pub fn booking_requested(
    booking: &Booking,
    provider_name: &str,
    provider_email: &str,
    admin_email: &str,
) -> Vec<OutboundEmail> {
    let service = service_label(booking);
    let mut emails = vec![OutboundEmail {
        to: booking.client_email.clone(),
        subject: format!("Booking received: {service} with {provider_name}"),
        text: format!(
            "Dear {},\n\nYour request for {service} with {provider_name} on {} at {} has been received and is awaiting confirmation.\n",
            booking.client_name, booking.date, booking.time
        ),
    }];

    if !provider_email.is_empty() {
        emails.push(OutboundEmail {
            to: provider_email.to_string(),
            subject: format!("New booking request: {service} on {}", booking.date),
            text: format!(
                "Dear {provider_name},\n\n{} ({}) has requested {service} on {} at {}. Please confirm or decline the request.\n",
                booking.client_name, booking.client_email, booking.date, booking.time
            ),
        });
    }

    if !admin_email.is_empty() {
        emails.push(OutboundEmail {
            to: admin_email.to_string(),
            subject: format!("New booking: {} - {}", booking.client_name, booking.date),
            text: format!(
                "Client: {} ({})\nProvider: {provider_name}\nService: {service}\nDate: {} at {}\n",
                booking.client_name, booking.client_email, booking.date, booking.time
            ),
        });
    }

    emails
}

/// Mail telling the client their request was accepted or declined. Other
/// statuses produce nothing.
pub fn status_update(booking: &Booking, provider_name: &str) -> Option<OutboundEmail> {
    let service = service_label(booking);
    let (subject, body) = match booking.status {
        BookingStatus::Confirmed => (
            format!("Booking confirmed: {service}"),
            format!("Your session with {provider_name} has been confirmed. Please arrive on time."),
        ),
        BookingStatus::Rejected => (
            format!("Booking update: {service}"),
            format!(
                "Unfortunately, {provider_name} is unable to accept this request. Please try a different time slot."
            ),
        ),
        _ => return None,
    };

    Some(OutboundEmail {
        to: booking.client_email.clone(),
        subject,
        text: format!(
            "Dear {},\n\n{body}\n\nService: {service}\nDate: {}\nTime: {}\n",
            booking.client_name, booking.date, booking.time
        ),
    })
}

/// Sends each mail, logging failures. Delivery never fails the caller.
pub async fn deliver(notifier: &dyn Notifier, emails: Vec<OutboundEmail>) {
    for email in emails {
        if let Err(e) = notifier.send(&email).await {
            tracing::error!(to = %email.to, subject = %email.subject, error = %e, "failed to send notification");
        }
    }
}
