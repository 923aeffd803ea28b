/// Shared domain enums used across handlers and the data layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Verification status of a welfare record. Records are created in
/// `Menunggu`; any status may transition to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Menunggu,
    Disetujui,
    Ditolak,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Menunggu => "Menunggu",
            Status::Disetujui => "Disetujui",
            Status::Ditolak => "Ditolak",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Menunggu" => Ok(Status::Menunggu),
            "Disetujui" => Ok(Status::Disetujui),
            "Ditolak" => Ok(Status::Ditolak),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller role carried in the token claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The two record tables share one CRUD and reporting contract; this
/// enum carries the per-table differences (name, period column, labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Pendataan,
    Zkup,
}

impl Dataset {
    pub fn table(self) -> &'static str {
        match self {
            Dataset::Pendataan => "pendataan",
            Dataset::Zkup => "zkup",
        }
    }

    /// Column holding the reporting period: realisation year for
    /// pendataan, periode for zkup.
    pub fn period_column(self) -> &'static str {
        match self {
            Dataset::Pendataan => "tahun_realisasi",
            Dataset::Zkup => "periode",
        }
    }

    /// Lowercase source name used in request bodies and report envelopes.
    pub fn source_name(self) -> &'static str {
        self.table()
    }

    /// Display label used as the `sumber` tag in the combined report.
    pub fn sumber_label(self) -> &'static str {
        match self {
            Dataset::Pendataan => "Pendataan",
            Dataset::Zkup => "ZKUP",
        }
    }

    pub fn from_source(s: &str) -> Option<Self> {
        match s {
            "pendataan" => Some(Dataset::Pendataan),
            "zkup" => Some(Dataset::Zkup),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [Status::Menunggu, Status::Disetujui, Status::Ditolak] {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("menunggu".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_value(Status::Disetujui).unwrap(),
            serde_json::json!("Disetujui")
        );
    }

    #[test]
    fn role_parses_lowercase_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn dataset_source_names() {
        assert_eq!(Dataset::from_source("pendataan"), Some(Dataset::Pendataan));
        assert_eq!(Dataset::from_source("zkup"), Some(Dataset::Zkup));
        assert_eq!(Dataset::from_source("ZKUP"), None);
        assert_eq!(Dataset::Pendataan.period_column(), "tahun_realisasi");
        assert_eq!(Dataset::Zkup.period_column(), "periode");
    }
}
