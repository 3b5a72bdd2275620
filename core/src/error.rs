//! Typed rejection reasons returned when a command's preconditions fail.

use thiserror::Error;

use crate::{AttackOutcome, CellKey, PlayerId, StructureId, StructureKind};

/// Reasons the world refuses to apply a command.
///
/// Every variant carries the values needed to explain the failure to the
/// player, such as the current balance versus the required one.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ActionError {
    /// The acting player has not been registered with the world.
    #[error("player {player} is not registered")]
    UnknownPlayer {
        /// Identifier supplied with the command.
        player: PlayerId,
    },
    /// A player with the same identifier is already registered.
    #[error("player {player} is already registered")]
    PlayerAlreadyRegistered {
        /// Identifier supplied with the command.
        player: PlayerId,
    },
    /// No turf with the provided key has been materialized.
    #[error("turf {turf} does not exist")]
    UnknownTurf {
        /// Key supplied with the command.
        turf: CellKey,
    },
    /// The player is too far from the turf for a range-gated action.
    #[error("turf {turf} is out of range")]
    NotInRange {
        /// Turf the player tried to act on.
        turf: CellKey,
    },
    /// The acting player does not own the turf.
    #[error("turf {turf} is not owned by the acting player")]
    NotOwner {
        /// Turf the player tried to act on.
        turf: CellKey,
        /// Current owner of the turf, if any.
        owner: Option<PlayerId>,
    },
    /// The turf already has an owner and cannot be captured.
    #[error("turf {turf} is already owned by {owner}")]
    NotNeutral {
        /// Turf the player tried to capture.
        turf: CellKey,
        /// Current owner of the turf.
        owner: PlayerId,
    },
    /// The acting player already owns the turf it tried to attack.
    #[error("turf {turf} is already owned by the acting player")]
    AlreadyOwned {
        /// Turf the player tried to attack.
        turf: CellKey,
    },
    /// Neutral turfs are captured, not attacked.
    #[error("turf {turf} is neutral")]
    NeutralTurf {
        /// Turf the player tried to attack.
        turf: CellKey,
    },
    /// The wallet does not cover the cost of the action.
    #[error("insufficient funds: {required} required, {available} available")]
    InsufficientFunds {
        /// Amount the action costs.
        required: f64,
        /// Wallet balance at the time of the request.
        available: f64,
    },
    /// A cash amount was zero, negative or not finite.
    #[error("amount {amount} must be a positive number")]
    InvalidAmount {
        /// Amount supplied with the command.
        amount: f64,
    },
    /// The vault holds no cash to collect.
    #[error("turf {turf} has nothing to collect")]
    NothingToCollect {
        /// Turf the player tried to collect from.
        turf: CellKey,
    },
    /// The turf already carries a structure of the requested kind.
    #[error("turf {turf} already has a {}", .kind.name())]
    StructureAlreadyExists {
        /// Turf the player tried to build on.
        turf: CellKey,
        /// Kind that already exists.
        kind: StructureKind,
    },
    /// No structure with the provided identifier stands on the turf.
    #[error("structure {structure} not found on turf {turf}")]
    StructureNotFound {
        /// Turf the player tried to upgrade on.
        turf: CellKey,
        /// Identifier supplied with the command.
        structure: StructureId,
    },
    /// The structure is still being built or upgraded.
    #[error("structure {structure} is still building for {remaining_secs:.1}s")]
    StructureStillBuilding {
        /// Structure the player tried to upgrade.
        structure: StructureId,
        /// Seconds left until the current build completes.
        remaining_secs: f64,
    },
    /// Another attacker already holds the turf under attack.
    #[error("turf {turf} is already under attack by {attacker}")]
    TurfAlreadyUnderAttack {
        /// Turf the player tried to act on.
        turf: CellKey,
        /// Attacker currently engaged with the turf.
        attacker: PlayerId,
    },
    /// Reinforcement was requested while no attack is in progress.
    #[error("turf {turf} is not under attack")]
    NotUnderAttack {
        /// Turf the player tried to reinforce.
        turf: CellKey,
    },
    /// The turf was attacked too recently to be attacked again.
    #[error("turf {turf} can be attacked again in {remaining_secs:.1}s")]
    AttackOnCooldown {
        /// Turf the player tried to attack.
        turf: CellKey,
        /// Seconds left on the cooldown.
        remaining_secs: f64,
    },
    /// The defense multiplier is already at its configured maximum.
    #[error("turf {turf} already has the maximum defense multiplier {max}")]
    DefenseAtMaximum {
        /// Turf the player tried to fortify.
        turf: CellKey,
        /// Configured maximum multiplier.
        max: u8,
    },
    /// A tick command was computed from state that has since changed.
    #[error("update for turf {turf} was computed from outdated state")]
    StaleUpdate {
        /// Turf the tick command targeted.
        turf: CellKey,
    },
    /// Only a win or a timeout ends an attack in progress.
    #[error("outcome {outcome:?} cannot end the attack on turf {turf}")]
    UnresolvableOutcome {
        /// Turf under attack.
        turf: CellKey,
        /// Outcome supplied with the command.
        outcome: AttackOutcome,
    },
    /// No completed defense tower on `to` reaches `from`.
    #[error("no completed defense tower on turf {to} reaches turf {from}")]
    OutOfTowerReach {
        /// Turf the siphon would drain.
        from: CellKey,
        /// Turf the siphon would fill.
        to: CellKey,
    },
}
