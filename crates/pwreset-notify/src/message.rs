//! Notification message bodies.

/// A composed notification ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
}

/// Composes the phase-1 confirmation email.
///
/// The link embeds the confirmation token; following it is the out-of-band
/// proof that the requester controls the mail address on file.
#[must_use]
pub fn confirmation_request(account: &str, confirm_url: &str) -> MailMessage {
    let subject = "Directory password change request".to_string();
    let html = format!(
        "<html>\
           <head><title>Directory password change request</title></head>\
           <body>\
             Hello,<br><br>\
             A password change was requested for the account {account}. \
             Please follow the link below to confirm the request:\
             <br><a href=\"{confirm_url}\">Confirm the password change request</a>\
             <br><br>If you did not initiate this request, please ignore this e-mail.\
             <br><br>Regards,\
             <br><br>The IT department\
           </body>\
         </html>"
    );
    MailMessage { subject, html }
}

/// Composes the phase-2 new-credential email.
#[must_use]
pub fn credential_issued(account: &str, credential: &str) -> MailMessage {
    let subject = "Directory password change confirmation".to_string();
    let html = format!(
        "<html>\
           <head><title>Directory password change confirmation</title></head>\
           <body>\
             Hello,<br><br>\
             Your password change request for the account {account} has been \
             processed. Your new password is:\
             <br>{credential}\
             <br><br>Please delete this e-mail once you have memorized your new password.\
             <br><br>Regards,\
             <br><br>The IT department\
           </body>\
         </html>"
    );
    MailMessage { subject, html }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_embeds_account_and_link() {
        let message = confirmation_request(
            "jdupont",
            "https://reset.example.com/?step=change&token=xk4vbn2dwge8mfa",
        );
        assert!(message.subject.contains("request"));
        assert!(message.html.contains("jdupont"));
        assert!(message
            .html
            .contains("href=\"https://reset.example.com/?step=change&token=xk4vbn2dwge8mfa\""));
        assert!(message.html.contains("ignore this e-mail"));
    }

    #[test]
    fn credential_mail_carries_the_new_password() {
        let message = credential_issued("jdupont", "xk4vbn2d");
        assert!(message.subject.contains("confirmation"));
        assert!(message.html.contains("xk4vbn2d"));
        assert!(message.html.contains("delete this e-mail"));
    }
}
