//! Mail client handoff for the exported report.

use rust_decimal::Decimal;

use crate::models::config::MailConfig;
use crate::models::{format_amount, EmployeeDetails};
use crate::report::layout::{ID_LABEL, NAME_LABEL, TOTAL_LABEL};

/// A message to hand to the user's mail client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDraft {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl MailDraft {
    /// Draft announcing a report for `employee` totalling `total`.
    pub fn for_report(
        config: &MailConfig,
        employee: &EmployeeDetails,
        total: Decimal,
        currency: &str,
        attachment_name: &str,
    ) -> Self {
        let body = [
            format!("{}: {}", NAME_LABEL, employee.name),
            format!("{}: {}", ID_LABEL, employee.id),
            format!("{}: {} {}", TOTAL_LABEL, format_amount(total), currency),
            String::new(),
            format!("מצורף: {}", attachment_name),
        ]
        .join("\n");

        Self {
            recipient: config.recipient.trim().to_string(),
            subject: config.subject.clone(),
            body,
        }
    }

    /// `mailto:` URL with percent-encoded subject and body.
    ///
    /// Mail clients cannot take attachments through a link; the user
    /// attaches the exported file by hand.
    pub fn to_mailto(&self) -> String {
        let mut link = format!("mailto:{}", urlencoding::encode(&self.recipient).replace("%40", "@"));

        let mut params = Vec::new();
        if !self.subject.is_empty() {
            params.push(format!("subject={}", urlencoding::encode(&self.subject)));
        }
        if !self.body.is_empty() {
            // mailto bodies use CRLF line breaks
            let body = self.body.replace('\n', "\r\n");
            params.push(format!("body={}", urlencoding::encode(&body)));
        }

        if !params.is_empty() {
            link.push('?');
            link.push_str(&params.join("&"));
        }
        link
    }
}
