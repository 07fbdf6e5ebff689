//! Giver → receiver pairing.
//!
//! # Invariants
//! - `giver_token != receiver_token`.
//! - Within one draw, each token appears once as giver and once as receiver.
//! - A stored assignment is never recomputed; only a reset removes it.

use crate::model::participant::Participant;
use crate::model::token::Token;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub giver_token: Token,
    pub giver_name: String,
    pub receiver_token: Token,
    pub receiver_name: String,
}

impl Assignment {
    pub fn pair(giver: &Participant, receiver: &Participant) -> Self {
        Self {
            giver_token: giver.token.clone(),
            giver_name: giver.name.clone(),
            receiver_token: receiver.token.clone(),
            receiver_name: receiver.name.clone(),
        }
    }

    pub fn is_self_assignment(&self) -> bool {
        self.giver_token == self.receiver_token
    }
}
