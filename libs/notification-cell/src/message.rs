//! Reminder wording and phone addressing, in Portuguese as sent to patients.

pub const REMINDER_SUBJECT: &str = "Lembrete de Consulta";

pub fn reminder_text(patient_name: &str, date: &str, time: &str) -> String {
    format!(
        "Olá {}, este é um lembrete da sua consulta agendada para {} às {}. Qualquer dúvida, estou à disposição!",
        patient_name, date, time
    )
}

pub fn reminder_html(patient_name: &str, date: &str, time: &str) -> String {
    format!(
        "<p>Olá <b>{}</b>, este é um lembrete da sua consulta agendada para <b>{}</b> às <b>{}</b>.<br>Qualquer dúvida, estou à disposição!</p>",
        patient_name, date, time
    )
}

fn digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Twilio WhatsApp address for a free-form phone number, assuming Brazil
/// when no country code is present. 13-digit Brazilian mobiles lose the
/// leading 9 after the area code. `None` when the input has no digits.
pub fn whatsapp_address(phone: &str) -> Option<String> {
    let mut number = digits(phone);
    if number.is_empty() {
        return None;
    }
    if number.starts_with("55") && number.len() == 13 {
        number = format!("{}{}", &number[..4], &number[5..]);
    }
    if !number.starts_with("55") {
        number = format!("55{}", number);
    }
    Some(format!("whatsapp:+{}", number))
}

/// Click-to-chat link that opens WhatsApp with the reminder pre-filled.
pub fn whatsapp_share_link(phone: &str, text: &str) -> String {
    format!("https://wa.me/{}?text={}", digits(phone), urlencoding::encode(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_text_wording() {
        assert_eq!(
            reminder_text("John Doe", "2026-10-16", "10:00"),
            "Olá John Doe, este é um lembrete da sua consulta agendada para 2026-10-16 às 10:00. Qualquer dúvida, estou à disposição!"
        );
        assert!(reminder_html("John Doe", "2026-10-16", "10:00").contains("<b>John Doe</b>"));
    }

    #[test]
    fn test_brazilian_mobile_drops_ninth_digit() {
        assert_eq!(
            whatsapp_address("+55 (11) 98888-0101").as_deref(),
            Some("whatsapp:+551188880101")
        );
    }

    #[test]
    fn test_country_code_is_added() {
        assert_eq!(
            whatsapp_address("11 8888-0101").as_deref(),
            Some("whatsapp:+551188880101")
        );
        assert_eq!(
            whatsapp_address("+1 555 0101").as_deref(),
            Some("whatsapp:+5515550101")
        );
        assert_eq!(whatsapp_address("n/a"), None);
    }

    #[test]
    fn test_share_link_encodes_text() {
        let link = whatsapp_share_link("+55 11 98888-0101", "Olá John, às 10:00");
        assert_eq!(
            link,
            "https://wa.me/5511988880101?text=Ol%C3%A1%20John%2C%20%C3%A0s%2010%3A00"
        );
    }
}
