use chrono::NaiveDateTime;

use crate::formats::Record;
use crate::identity;

pub const NO_NEW_ENTRIES_SUBJECT: &str = "Keine neuen Lehrgänge gefunden";
const UNKNOWN_STATUS: &str = "unbekannt";
const RULE: &str = "-----------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
    pub entry_count: usize,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Renders the digest mail for `new_records`.
///
/// Never fails: records with missing fields render with placeholders.
pub fn build_digest(new_records: &[Record], generated_at: NaiveDateTime) -> Digest {
    if new_records.is_empty() {
        return Digest {
            subject: NO_NEW_ENTRIES_SUBJECT.to_owned(),
            text_body: "Es wurden keine neuen Lehrgänge gefunden.\n".to_owned(),
            html_body: html_document(
                "Keine neuen Lehrgänge gefunden",
                "<p>Es wurden keine neuen Lehrgänge gefunden.</p>",
                generated_at,
            ),
            entry_count: 0,
        };
    }

    let count = new_records.len();
    let mut text_body = format!("Neue Lehrgänge gefunden: {count}\n\n");
    let mut entries_html = String::from("<p>Folgende neue Lehrgänge wurden gefunden:</p>\n");
    for record in new_records {
        let entry = DigestEntry::from_record(record);
        text_body.push_str(&entry.to_text());
        entries_html.push_str(&entry.to_html());
    }

    Digest {
        subject: format!("Neue Lehrgänge gefunden ({count})"),
        text_body,
        html_body: html_document(
            &format!("Neue Lehrgänge gefunden: {count}"),
            &entries_html,
            generated_at,
        ),
        entry_count: count,
    }
}

struct DigestEntry<'a> {
    course_name: &'a str,
    status: &'a str,
    date_spec: &'a str,
    location: &'a str,
}

impl<'a> DigestEntry<'a> {
    fn from_record(record: &'a Record) -> Self {
        let (course_name, status) = identity::split_description(&record.description);
        let course_name = if course_name.trim().is_empty() {
            record.course_name.as_str()
        } else {
            course_name
        };
        let status = status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_STATUS);
        Self {
            course_name,
            status,
            date_spec: &record.date_spec,
            location: &record.location,
        }
    }

    fn to_text(&self) -> String {
        format!(
            "\n{}\n{RULE}\nTermin: {}\nStatus: {}\nOrt: {}\n{RULE}\n",
            self.course_name, self.date_spec, self.status, self.location
        )
    }

    fn to_html(&self) -> String {
        let location = escape_html(self.location).replace(". ", ".<br>");
        format!(
            r#"<div style="margin-bottom: 20px; border: 1px solid #ddd; padding: 15px; border-radius: 5px;">
  <h2 style="color: #d9534f; margin-top: 0;">{course}</h2>
  <table style="width: 100%; border-collapse: collapse;">
    <tr>
      <td style="padding: 8px; border-bottom: 1px solid #ddd; width: 120px;"><strong>Termin:</strong></td>
      <td style="padding: 8px; border-bottom: 1px solid #ddd;">{date}</td>
    </tr>
    <tr>
      <td style="padding: 8px; border-bottom: 1px solid #ddd;"><strong>Status:</strong></td>
      <td style="padding: 8px; border-bottom: 1px solid #ddd;">{status}</td>
    </tr>
    <tr>
      <td style="padding: 8px; vertical-align: top;"><strong>Ort:</strong></td>
      <td style="padding: 8px;">{location}</td>
    </tr>
  </table>
</div>
"#,
            course = escape_html(self.course_name),
            date = escape_html(self.date_spec),
            status = escape_html(self.status),
        )
    }
}

fn html_document(heading: &str, content: &str, generated_at: NaiveDateTime) -> String {
    let generated = generated_at.format("%d.%m.%Y um %H:%M");
    format!(
        r#"<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
    h1 {{ color: #d9534f; }}
    .container {{ max-width: 800px; margin: 0 auto; padding: 20px; }}
    .footer {{ margin-top: 30px; font-size: 12px; color: #777; border-top: 1px solid #ddd; padding-top: 10px; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>{heading}</h1>
{content}
    <div class="footer">
      <p>Diese E-Mail wurde automatisch generiert am {generated} Uhr.</p>
    </div>
  </div>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
