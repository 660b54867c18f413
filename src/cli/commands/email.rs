use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("brevo-api-key")
                .long("brevo-api-key")
                .help("Brevo API key; one-time code emails are logged instead of sent when absent")
                .env("DUNGI_BREVO_API_KEY"),
        )
        .arg(
            Arg::new("email-from")
                .long("email-from")
                .help("Sender address for one-time code emails")
                .env("DUNGI_EMAIL_FROM")
                .default_value("noreply@jobportal.com"),
        )
        .arg(
            Arg::new("email-from-name")
                .long("email-from-name")
                .help("Sender display name for one-time code emails")
                .env("DUNGI_EMAIL_FROM_NAME")
                .default_value("Job Portal"),
        )
}
