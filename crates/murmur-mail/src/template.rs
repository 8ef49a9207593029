use crate::OutgoingEmail;

pub const VERIFICATION_SUBJECT: &str = "Murmur | Verification code";

/// Render the one-time code email sent at sign-up and on resend.
pub fn verification_email(to: &str, username: &str, code: &str) -> OutgoingEmail {
    let name = escape_html(username);
    let otp = escape_html(code);

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en" dir="ltr">
  <head>
    <meta charset="utf-8">
    <title>Verification Code</title>
  </head>
  <body style="font-family: Roboto, Verdana, sans-serif;">
    <h2>Hello {name},</h2>
    <p>Thank you for registering. Please use the following verification code to complete your registration:</p>
    <p style="font-size: 20px; font-weight: bold;">{otp}</p>
    <p style="color: #888; font-size: 12px;">This code expires in one hour. If you did not request this code, please ignore this email.</p>
  </body>
</html>
"#
    );

    let text = format!(
        "Hello {username},\n\n\
         Thank you for registering. Please use the following verification code to complete your registration:\n\n\
         {code}\n\n\
         This code expires in one hour. If you did not request this code, please ignore this email.\n"
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: VERIFICATION_SUBJECT.to_string(),
        html,
        text,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
