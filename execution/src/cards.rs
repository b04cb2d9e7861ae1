//! Physical card bookkeeping: scanning, claiming and dropping cards.
//!
//! The shared pool and the inventories partition the catalog: every card is either
//! available or owned by exactly one player.

use tycoon_types::{Card, CardId, CardInfo, Catalog, Game, GameError, PlayerId};

use crate::guards::{require_in_progress, require_participant};

fn lookup<'a>(catalog: &'a Catalog, id: &CardId) -> Result<&'a Card, GameError> {
    catalog
        .card(id)
        .ok_or_else(|| GameError::Unknown(id.to_string()))
}

fn require_open_inventory(game: &Game, actor: PlayerId) -> Result<(), GameError> {
    require_participant(game, actor)?;
    require_in_progress(game)?;
    if game
        .settlement
        .entries
        .get(&actor)
        .is_some_and(|entry| entry.started)
    {
        return Err(GameError::bad_state("inventory is frozen once the audit has started"));
    }
    Ok(())
}

/// Card facts plus where the card currently is.
pub fn scan_card(
    game: &Game,
    catalog: &Catalog,
    actor: PlayerId,
    id: &CardId,
) -> Result<CardInfo, GameError> {
    if game.player(actor).is_none() {
        return Err(GameError::NotFound(format!("player {actor}")));
    }
    require_in_progress(game)?;
    let card = lookup(catalog, id)?;
    let owner = game
        .inventories
        .iter()
        .find(|(_, inventory)| inventory.holds(id))
        .map(|(player, _)| *player);
    Ok(CardInfo {
        card: card.clone(),
        available: game.availability.contains(card.kind(), id),
        owner,
    })
}

pub fn claim_card(
    game: &mut Game,
    catalog: &Catalog,
    actor: PlayerId,
    id: &CardId,
) -> Result<(), GameError> {
    require_open_inventory(game, actor)?;
    let card = lookup(catalog, id)?;
    if !game.availability.pool_mut(card.kind()).remove(id) {
        return Err(GameError::NotAvailable(id.to_string()));
    }
    let spent = game.spent_experts.contains(id);
    game.inventories.entry(actor).or_default().add(card, spent);
    tracing::debug!(code = %game.code, player = %actor, card = %id, "card claimed");
    Ok(())
}

pub fn drop_card(
    game: &mut Game,
    catalog: &Catalog,
    actor: PlayerId,
    id: &CardId,
) -> Result<(), GameError> {
    require_open_inventory(game, actor)?;
    let card = lookup(catalog, id)?;
    let removed = game
        .inventories
        .get_mut(&actor)
        .is_some_and(|inventory| inventory.remove(card));
    if !removed {
        return Err(GameError::NotOwned(id.to_string()));
    }
    game.availability.pool_mut(card.kind()).insert(id.clone());
    tracing::debug!(code = %game.code, player = %actor, card = %id, "card dropped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{started_game, P1, P2};
    use tycoon_types::{Ability, CardKind, Stage};

    #[test]
    fn test_claim_and_drop_keep_ownership_exclusive() {
        let (mut game, catalog) = started_game(2);
        let id = CardId::from("INV-01");
        claim_card(&mut game, &catalog, P1, &id).unwrap();
        assert!(!game.availability.contains(CardKind::Investment, &id));
        assert_eq!(
            claim_card(&mut game, &catalog, P2, &id).unwrap_err().code(),
            "NOT_AVAILABLE"
        );
        assert_eq!(
            drop_card(&mut game, &catalog, P2, &id).unwrap_err().code(),
            "NOT_OWNED"
        );
        game.validate_invariants().unwrap();

        drop_card(&mut game, &catalog, P1, &id).unwrap();
        assert!(game.availability.contains(CardKind::Investment, &id));
        claim_card(&mut game, &catalog, P2, &id).unwrap();
        game.validate_invariants().unwrap();
    }

    #[test]
    fn test_scan_reports_owner() {
        let (mut game, catalog) = started_game(1);
        let id = CardId::from("FARM-01");
        let info = scan_card(&game, &catalog, P1, &id).unwrap();
        assert!(info.available);
        assert_eq!(info.owner, None);
        claim_card(&mut game, &catalog, P1, &id).unwrap();
        let info = scan_card(&game, &catalog, P1, &id).unwrap();
        assert!(!info.available);
        assert_eq!(info.owner, Some(P1));
        assert_eq!(
            scan_card(&game, &catalog, P1, &CardId::from("NOPE")).unwrap_err().code(),
            "UNKNOWN"
        );
    }

    #[test]
    fn test_expert_cards_grant_tokens() {
        let (mut game, catalog) = started_game(1);
        let id = CardId::from("LAW-01");
        claim_card(&mut game, &catalog, P1, &id).unwrap();
        assert_eq!(game.inventory(P1).unwrap().abilities.available(Ability::Lawyer), 1);
        drop_card(&mut game, &catalog, P1, &id).unwrap();
        assert_eq!(game.inventory(P1).unwrap().abilities.available(Ability::Lawyer), 0);
    }

    #[test]
    fn test_spent_expert_stays_spent_across_owners() {
        let (mut game, catalog) = started_game(2);
        let id = CardId::from("LAW-01");
        claim_card(&mut game, &catalog, P1, &id).unwrap();
        assert!(game.spend_experts(P1, Ability::Lawyer, 1));

        drop_card(&mut game, &catalog, P1, &id).unwrap();
        assert!(game.spent_experts.contains(&id));
        claim_card(&mut game, &catalog, P1, &id).unwrap();
        let abilities = &game.inventory(P1).unwrap().abilities;
        assert_eq!(abilities.available(Ability::Lawyer), 0);
        assert_eq!(abilities.spent(Ability::Lawyer), 1);
        game.validate_invariants().unwrap();

        drop_card(&mut game, &catalog, P1, &id).unwrap();
        claim_card(&mut game, &catalog, P2, &id).unwrap();
        assert_eq!(game.inventory(P2).unwrap().abilities.available(Ability::Lawyer), 0);
        assert!(!game.spend_experts(P2, Ability::Lawyer, 1));
        game.validate_invariants().unwrap();

        // A fresh card of the same kind still works.
        claim_card(&mut game, &catalog, P2, &CardId::from("LAW-02")).unwrap();
        assert!(game.spend_experts(P2, Ability::Lawyer, 1));
    }

    #[test]
    fn test_frozen_after_audit_start() {
        let (mut game, catalog) = started_game(2);
        game.stage = Some(Stage::Settle);
        game.settlement.entries.entry(P1).or_default().started = true;
        assert_eq!(
            claim_card(&mut game, &catalog, P1, &CardId::from("INV-02")).unwrap_err().code(),
            "BAD_STATE"
        );
        claim_card(&mut game, &catalog, P2, &CardId::from("INV-02")).unwrap();
    }

    #[test]
    fn test_cards_need_a_running_game() {
        let (mut game, catalog) = started_game(1);
        game.status = tycoon_types::GameStatus::GameOver;
        game.stage = None;
        assert_eq!(
            claim_card(&mut game, &catalog, P1, &CardId::from("INV-01")).unwrap_err().code(),
            "BAD_STATE"
        );
    }
}
