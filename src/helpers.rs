use std::{fmt, io, str::FromStr};

use chrono::{DateTime, Utc};

/// Formats with K/M/B suffixes: `320000000.0` → `"320.0M"`.
pub fn format_large_number(number: f64, decimals: usize) -> String {
    if !number.is_finite() {
        return String::from("N/A");
    }

    let abs = number.abs();

    if abs < 1_000.0 {
        format!("{:.*}", decimals, number)
    } else if abs < 1_000_000.0 {
        format!("{:.*}K", decimals, number / 1_000.0)
    } else if abs < 1_000_000_000.0 {
        format!("{:.*}M", decimals, number / 1_000_000.0)
    } else {
        format!("{:.*}B", decimals, number / 1_000_000_000.0)
    }
}

pub fn format_utc(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

pub fn parse_list(data: &str) -> Vec<String> {
    data.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_owned())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Subscribed,
    Unsubscribed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Subscribed => write!(f, "subscribed"),
            Status::Unsubscribed => write!(f, "unsubscribed"),
        }
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Web,
    Bot,
    All,
}

impl Role {
    pub fn runs_web(&self) -> bool {
        matches!(self, Role::Web | Role::All)
    }

    pub fn runs_bot(&self) -> bool {
        matches!(self, Role::Bot | Role::All)
    }

    /// `All` without a bot token degrades to `Web`.
    pub fn with_bot_available(self, available: bool) -> Role {
        match self {
            Role::All if !available => Role::Web,
            role => role,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Web => write!(f, "web"),
            Role::Bot => write!(f, "bot"),
            Role::All => write!(f, "all"),
        }
    }
}

impl FromStr for Role {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Role, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "web" => Ok(Role::Web),
            "bot" => Ok(Role::Bot),
            "all" => Ok(Role::All),
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("Role not supported: {}", value),
            )),
        }
    }
}
