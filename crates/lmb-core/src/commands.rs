use crate::domain::ChatReference;

/// A parsed operator command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorCommand {
    Help,
    SetSource(ChatReference),
    SetTarget(u8, ChatReference),
    SetDestination(u8, ChatReference),
    BeginSourceRange,
    BeginTargetRange(u8),
    Status,
    Reset,
    Run,
    /// Known command with missing or malformed arguments.
    Usage(&'static str),
    Unknown(String),
}

impl OperatorCommand {
    /// Parse `/cmd[@botname] args...`. Returns `None` for non-command text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }
        let (cmd, rest) = split_command(text);
        let mut args = rest.split_whitespace();

        let parsed = match cmd.as_str() {
            "start" | "help" => Self::Help,
            "setsource" => match args.next() {
                Some(r) => Self::SetSource(ChatReference::parse(r)),
                None => Self::Usage("/setsource <username_or_-100id>"),
            },
            "settarget" => match numbered_chat(&mut args) {
                Some((n, r)) => Self::SetTarget(n, r),
                None => Self::Usage("/settarget <n> <username_or_-100id>"),
            },
            "setdest" => match numbered_chat(&mut args) {
                Some((n, r)) => Self::SetDestination(n, r),
                None => Self::Usage("/setdest <n> <username_or_-100id>"),
            },
            "setsourcerange" => Self::BeginSourceRange,
            "settargetrange" => match args.next().and_then(parse_number) {
                Some(n) => Self::BeginTargetRange(n),
                None => Self::Usage("/settargetrange <n>"),
            },
            "status" => Self::Status,
            "reset" => Self::Reset,
            "run" => Self::Run,
            _ => Self::Unknown(cmd),
        };
        Some(parsed)
    }
}

fn split_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn parse_number(s: &str) -> Option<u8> {
    s.parse::<u8>().ok().filter(|n| *n >= 1)
}

fn numbered_chat<'a>(args: &mut impl Iterator<Item = &'a str>) -> Option<(u8, ChatReference)> {
    let n = args.next().and_then(parse_number)?;
    let chat = args.next()?;
    Some((n, ChatReference::parse(chat)))
}
