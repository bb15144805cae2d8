use {
    super::{
        booking::{BookingDetails, Ticket},
        money::{Currency, Money},
    },
    std::fmt::Write,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationMessage {
    pub subject: String,
    pub html: String,
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// One consolidated message listing every ticket of the booking.
/// `link_for` yields the code URL, or `None` when issuance failed.
pub fn render_confirmation(
    details: &BookingDetails,
    link_for: impl Fn(&Ticket) -> Option<String>,
) -> ConfirmationMessage {
    let booking = &details.booking;
    let event = &details.event;
    let currency = details
        .payment
        .as_ref()
        .map(|p| p.money.currency())
        .unwrap_or(Currency::Usd);
    let money = |amount| Money::new(amount, currency);

    let subject = format!(
        "Your tickets for {} (booking {})",
        event.title,
        booking.reference.as_str()
    );

    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>Booking {}</h1><p>Hi {}, your booking for <strong>{}</strong> at {} on {} is confirmed.</p>",
        escape(booking.reference.as_str()),
        escape(&details.customer.name),
        escape(&event.title),
        escape(&event.venue),
        event.starts_at.format("%Y-%m-%d %H:%M UTC"),
    );
    html.push_str("<table><tr><th>Ticket</th><th>Tier</th><th>Price</th><th>Code</th></tr>");
    for ticket in &details.tickets {
        let code = match link_for(ticket) {
            Some(url) => format!("<a href=\"{}\">View code</a>", escape(&url)),
            None => "available soon".to_string(),
        };
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&ticket.ticket_number),
            escape(details.tier_name(ticket.tier_id)),
            money(ticket.price),
            code,
        );
    }
    html.push_str("</table>");
    if booking.discount_amount.cents() > 0 {
        let _ = write!(
            html,
            "<p>Subtotal {}, discount {}</p>",
            money(booking.subtotal),
            money(booking.discount_amount),
        );
    }
    let _ = write!(html, "<p>Total paid: {}</p>", money(booking.total));

    ConfirmationMessage { subject, html }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
    }
}
