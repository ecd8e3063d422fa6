// Domain types - closed enumerations and pure rules, no storage access
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Returned when a stored or submitted value names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// --- Roles ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "admin_recinto", alias = "venue_admin", alias = "venue-admin")]
    VenueAdmin,
    #[serde(rename = "jugador", alias = "player")]
    Player,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::VenueAdmin => "admin_recinto",
            Role::Player => "jugador",
        }
    }

    /// Roles a visitor may pick for themselves at sign-up.
    pub fn is_self_assignable(&self) -> bool {
        match self {
            Role::Admin => false,
            Role::VenueAdmin | Role::Player => true,
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "admin_recinto" | "venue_admin" | "venue-admin" => Ok(Role::VenueAdmin),
            "jugador" | "player" => Ok(Role::Player),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Reactions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReactionKind {
    #[serde(rename = "me_gusta", alias = "like")]
    Like,
    #[serde(rename = "no_me_gusta", alias = "dislike")]
    Dislike,
    #[serde(rename = "me_encanta", alias = "love")]
    Love,
    #[serde(rename = "me_divierte", alias = "funny")]
    Funny,
    #[serde(rename = "me_asombra", alias = "wow")]
    Wow,
    #[serde(rename = "me_entristece", alias = "sad")]
    Sad,
    #[serde(rename = "me_enoja", alias = "angry")]
    Angry,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 7] = [
        ReactionKind::Like,
        ReactionKind::Dislike,
        ReactionKind::Love,
        ReactionKind::Funny,
        ReactionKind::Wow,
        ReactionKind::Sad,
        ReactionKind::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "me_gusta",
            ReactionKind::Dislike => "no_me_gusta",
            ReactionKind::Love => "me_encanta",
            ReactionKind::Funny => "me_divierte",
            ReactionKind::Wow => "me_asombra",
            ReactionKind::Sad => "me_entristece",
            ReactionKind::Angry => "me_enoja",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for ReactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "me_gusta" | "like" => Ok(ReactionKind::Like),
            "no_me_gusta" | "dislike" => Ok(ReactionKind::Dislike),
            "me_encanta" | "love" => Ok(ReactionKind::Love),
            "me_divierte" | "funny" => Ok(ReactionKind::Funny),
            "me_asombra" | "wow" => Ok(ReactionKind::Wow),
            "me_entristece" | "sad" => Ok(ReactionKind::Sad),
            "me_enoja" | "angry" => Ok(ReactionKind::Angry),
            other => Err(ParseEnumError::new("reaction type", other)),
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item reaction totals. Every kind is always present, starting at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionCounts([u64; 7]);

impl ReactionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ReactionKind) -> u64 {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: ReactionKind, count: u64) {
        self.0[kind.index()] = count;
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReactionKind, u64)> + '_ {
        ReactionKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl Serialize for ReactionCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ReactionKind::ALL.len()))?;
        for (kind, count) in self.iter() {
            map.serialize_entry(kind.as_str(), &count)?;
        }
        map.end()
    }
}

// --- Matches ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    #[serde(rename = "programado", alias = "scheduled")]
    Scheduled,
    #[serde(rename = "en_curso", alias = "in_progress")]
    InProgress,
    #[serde(rename = "finalizado", alias = "finished")]
    Finished,
    #[serde(rename = "cancelado", alias = "cancelled")]
    Cancelled,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 4] = [
        MatchStatus::Scheduled,
        MatchStatus::InProgress,
        MatchStatus::Finished,
        MatchStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "programado",
            MatchStatus::InProgress => "en_curso",
            MatchStatus::Finished => "finalizado",
            MatchStatus::Cancelled => "cancelado",
        }
    }

    /// Status only moves forward: scheduled -> in progress -> finished,
    /// or scheduled -> cancelled.
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Scheduled, MatchStatus::InProgress)
                | (MatchStatus::Scheduled, MatchStatus::Cancelled)
                | (MatchStatus::InProgress, MatchStatus::Finished)
        )
    }

    pub fn is_open_for_players(&self) -> bool {
        *self == MatchStatus::Scheduled
    }
}

impl FromStr for MatchStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "programado" | "scheduled" => Ok(MatchStatus::Scheduled),
            "en_curso" | "in_progress" => Ok(MatchStatus::InProgress),
            "finalizado" | "finished" => Ok(MatchStatus::Finished),
            "cancelado" | "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(ParseEnumError::new("match status", other)),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchFormat {
    #[serde(rename = "7v7")]
    SevenASide,
    #[serde(rename = "11v11")]
    ElevenASide,
}

impl MatchFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchFormat::SevenASide => "7v7",
            MatchFormat::ElevenASide => "11v11",
        }
    }

    pub fn players_per_team(&self) -> u32 {
        match self {
            MatchFormat::SevenASide => 7,
            MatchFormat::ElevenASide => 11,
        }
    }
}

impl FromStr for MatchFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7v7" => Ok(MatchFormat::SevenASide),
            "11v11" => Ok(MatchFormat::ElevenASide),
            other => Err(ParseEnumError::new("match format", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[serde(rename = "local", alias = "home")]
    Local,
    #[serde(rename = "visitante", alias = "away")]
    Visitante,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Local => "local",
            Team::Visitante => "visitante",
        }
    }
}

impl FromStr for Team {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "home" => Ok(Team::Local),
            "visitante" | "away" => Ok(Team::Visitante),
            other => Err(ParseEnumError::new("team", other)),
        }
    }
}

// --- Credits ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "tarjeta", alias = "card")]
    Card,
    #[serde(rename = "transferencia", alias = "transfer")]
    Transfer,
    #[serde(rename = "efectivo", alias = "cash")]
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "tarjeta",
            PaymentMethod::Transfer => "transferencia",
            PaymentMethod::Cash => "efectivo",
        }
    }

    /// Cash is collected in person and settled later; the rest clear at once.
    pub fn initial_status(&self) -> TransactionStatus {
        match self {
            PaymentMethod::Cash => TransactionStatus::Pending,
            PaymentMethod::Card | PaymentMethod::Transfer => TransactionStatus::Completed,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tarjeta" | "card" => Ok(PaymentMethod::Card),
            "transferencia" | "transfer" => Ok(PaymentMethod::Transfer),
            "efectivo" | "cash" => Ok(PaymentMethod::Cash),
            other => Err(ParseEnumError::new("payment method", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "fallido")]
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completado",
            TransactionStatus::Pending => "pendiente",
            TransactionStatus::Failed => "fallido",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completado" => Ok(TransactionStatus::Completed),
            "pendiente" => Ok(TransactionStatus::Pending),
            "fallido" => Ok(TransactionStatus::Failed),
            other => Err(ParseEnumError::new("transaction status", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_english_aliases() {
        assert_eq!("player".parse::<Role>().unwrap(), Role::Player);
        assert_eq!("venue-admin".parse::<Role>().unwrap(), Role::VenueAdmin);
        assert_eq!("jugador".parse::<Role>().unwrap(), Role::Player);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn admin_cannot_self_assign() {
        assert!(!Role::Admin.is_self_assignable());
        assert!(Role::Player.is_self_assignable());
        assert!(Role::VenueAdmin.is_self_assignable());
    }

    #[test]
    fn role_serializes_to_wire_name() {
        let json = serde_json::to_string(&Role::VenueAdmin).unwrap();
        assert_eq!(json, "\"admin_recinto\"");
        let parsed: Role = serde_json::from_str("\"player\"").unwrap();
        assert_eq!(parsed, Role::Player);
    }

    #[test]
    fn reaction_kind_round_trips_every_variant() {
        for kind in ReactionKind::ALL {
            assert_eq!(kind.as_str().parse::<ReactionKind>().unwrap(), kind);
        }
        assert_eq!("wow".parse::<ReactionKind>().unwrap(), ReactionKind::Wow);
        assert!("meh".parse::<ReactionKind>().is_err());
    }

    #[test]
    fn reaction_counts_serialize_all_seven_keys() {
        let mut counts = ReactionCounts::new();
        counts.set(ReactionKind::Love, 3);

        let value = serde_json::to_value(counts).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 7);
        assert_eq!(map["me_encanta"], 3);
        assert_eq!(map["me_enoja"], 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn match_status_only_moves_forward() {
        use MatchStatus::*;
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Finished));

        assert!(!InProgress.can_transition_to(Scheduled));
        assert!(!Finished.can_transition_to(InProgress));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn cash_starts_pending() {
        assert_eq!(
            PaymentMethod::Cash.initial_status(),
            TransactionStatus::Pending
        );
        assert_eq!(
            PaymentMethod::Card.initial_status(),
            TransactionStatus::Completed
        );
        assert_eq!(
            PaymentMethod::Transfer.initial_status(),
            TransactionStatus::Completed
        );
    }

    #[test]
    fn payment_method_accepts_spanish_and_english() {
        assert_eq!(
            "efectivo".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Cash
        );
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn match_format_sets_default_capacity() {
        assert_eq!(MatchFormat::SevenASide.players_per_team(), 7);
        assert_eq!("11v11".parse::<MatchFormat>().unwrap().players_per_team(), 11);
    }
}
