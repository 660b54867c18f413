use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_otp_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend origin allowed for CORS and session cookies")
                .env("DUNGI_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new("session-secret")
                .long("session-secret")
                .help("Secret used to sign session tokens")
                .env("DUNGI_SESSION_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session token TTL in seconds")
                .env("DUNGI_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_otp_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("otp-ttl-seconds")
                .long("otp-ttl-seconds")
                .help("One-time code TTL in seconds")
                .env("DUNGI_OTP_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("otp-resend-cooldown-seconds")
                .long("otp-resend-cooldown-seconds")
                .help("Cooldown before another code can be requested for the same email")
                .env("DUNGI_OTP_RESEND_COOLDOWN_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("otp-sweep-interval-seconds")
                .long("otp-sweep-interval-seconds")
                .help("Interval between expired one-time code sweeps")
                .env("DUNGI_OTP_SWEEP_INTERVAL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}
