use serde::Serialize;

use crate::domain::{
    MatchFormat, MatchStatus, PaymentMethod, ReactionCounts, ReactionKind, Role, Team,
    TransactionStatus,
};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Public view of another user (friend lists, rosters).
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterPlayer {
    pub user_id: i64,
    pub name: String,
    pub avatar: Option<String>,
    pub position: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamRoster {
    pub team: Team,
    /// Team capacity. Fixed when the match is created.
    pub puestos_disponibles: u32,
    /// Capacity minus current players.
    pub places_left: u32,
    pub players: Vec<RosterPlayer>,
}

impl TeamRoster {
    pub fn is_full(&self) -> bool {
        self.players.len() as u32 >= self.puestos_disponibles
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub id: i64,
    pub title: String,
    pub starts_at: String,
    pub commission: i64,
    pub status: MatchStatus,
    pub format: MatchFormat,
    pub venue: Venue,
    pub local: TeamRoster,
    pub visitante: TeamRoster,
    pub comment_count: i64,
    pub reactions: ReactionCounts,
    pub my_reactions: Vec<ReactionKind>,
}

impl Match {
    pub fn roster(&self, team: Team) -> &TeamRoster {
        match team {
            Team::Local => &self.local,
            Team::Visitante => &self.visitante,
        }
    }

    pub fn has_player(&self, user_id: i64) -> bool {
        self.local
            .players
            .iter()
            .chain(self.visitante.players.iter())
            .any(|p| p.user_id == user_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub id: i64,
    pub match_id: i64,
    pub match_title: String,
    pub inviter: UserSummary,
    pub invitee_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub author: UserSummary,
    pub text: String,
    pub hashtags: Vec<String>,
    pub images: Vec<String>,
    pub created_at: String,
    pub comment_count: i64,
    pub reactions: ReactionCounts,
    pub my_reactions: Vec<ReactionKind>,
}

/// Author details copied onto the comment when it was written.
#[derive(Debug, Clone, Serialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub parent_kind: String,
    pub parent_id: i64,
    pub author: CommentAuthor,
    pub text: String,
    pub reply_to_id: Option<i64>,
    pub created_at: String,
    pub reactions: ReactionCounts,
    pub my_reactions: Vec<ReactionKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSnapshot {
    pub total: i64,
    pub available: i64,
    pub pending: i64,
    pub transactions: Vec<CreditTransaction>,
}
