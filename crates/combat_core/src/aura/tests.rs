use super::*;
use crate::attribute::AttributeKind;
use crate::combat_controller::cast_spell;
use crate::data::{AuraCastTarget, AuraEffectKind, DataDocument};
use crate::error::CastError;
use crate::spell::CastRequest;
use crate::state::{Mechanic, MechanicFlags, UnitState};
use crate::test_support::{aura, document, duel, slot, SLASH};

const ARMOR: u32 = 10101;

fn armor_aura(id: u32, points: i64) -> AuraEntry {
    aura(
        id,
        vec![slot(
            AuraEffectKind::ModAttribute {
                attribute: AttributeKind::Armor,
            },
            AuraTrigger::Apply,
            points,
        )],
    )
}

fn with_auras(auras: Vec<AuraEntry>) -> DataDocument {
    let mut doc = document();
    doc.auras = auras;
    doc
}

fn armor_of(bf: &Battlefield, id: CombatantId) -> Fixed {
    bf.unit(id).unwrap().att().get(AttributeKind::Armor)
}

fn aura_count(bf: &Battlefield, id: CombatantId) -> usize {
    bf.unit(id).unwrap().combat().aura_count()
}

#[test]
fn test_attribute_aura_applies_and_reverts() {
    let (mut bf, attacker, defender) = duel(with_auras(vec![armor_aura(ARMOR, 50)]));

    let handle = add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap().unwrap();
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(50));
    assert!(bf.unit(defender).unwrap().combat().has_aura(ARMOR));

    assert!(remove_aura(&mut bf, defender, handle, RemoveMode::DISPEL));
    assert_eq!(armor_of(&bf, defender), Fixed::ZERO);
    assert_eq!(aura_count(&bf, defender), 0);
    // Stale handles are rejected.
    assert!(!remove_aura(&mut bf, defender, handle, RemoveMode::DISPEL));
}

#[test]
fn test_same_caster_wraps() {
    let mut entry = armor_aura(ARMOR, 50);
    entry.max_wraps = 3;
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));

    let first = add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();
    let second = add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();

    assert_eq!(first, second);
    assert_eq!(aura_count(&bf, defender), 1);
    let wraps = bf
        .unit(defender)
        .unwrap()
        .combat()
        .aura(second.unwrap())
        .unwrap()
        .wraps();
    assert_eq!(wraps, 2);
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(100));
}

#[test]
fn test_wraps_are_capped() {
    let (mut bf, attacker, defender) = duel(with_auras(vec![armor_aura(ARMOR, 50)]));
    for _ in 0..3 {
        add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();
    }
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(50));
}

#[test]
fn test_other_caster_adds_second_instance() {
    let (mut bf, attacker, defender) = duel(with_auras(vec![armor_aura(ARMOR, 50)]));

    add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();
    add_aura(&mut bf, defender, defender, ARMOR, 0).unwrap();

    assert_eq!(aura_count(&bf, defender), 2);
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(100));
}

#[test]
fn test_stronger_level_replaces_weaker() {
    let (mut bf, attacker, defender) = duel(with_auras(vec![
        armor_aura(ARMOR, 50),
        armor_aura(ARMOR + 1, 80),
    ]));

    add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();
    add_aura(&mut bf, attacker, defender, ARMOR + 1, 0).unwrap();

    let combat = bf.unit(defender).unwrap().combat();
    assert_eq!(combat.aura_count(), 1);
    assert!(combat.has_aura(ARMOR + 1));
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(80));
    assert!(bf
        .events()
        .iter()
        .any(|e| e.kind == EventKind::AuraRemoved && e.spell_id == ARMOR));

    // The weaker one can no longer get in.
    assert_eq!(add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap(), None);
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(80));
}

#[test]
fn test_timed_aura_expires() {
    let mut entry = armor_aura(ARMOR, 50);
    entry.duration = 2;
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();

    round_end(&mut bf, defender);
    assert_eq!(aura_count(&bf, defender), 1);
    round_end(&mut bf, defender);
    assert_eq!(aura_count(&bf, defender), 0);
    assert_eq!(armor_of(&bf, defender), Fixed::ZERO);
}

#[test]
fn test_permanent_aura_never_expires() {
    let (mut bf, attacker, defender) = duel(with_auras(vec![armor_aura(ARMOR, 50)]));
    add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap();
    for _ in 0..20 {
        round_end(&mut bf, defender);
    }
    assert_eq!(aura_count(&bf, defender), 1);
}

#[test]
fn test_periodic_damage_each_round() {
    let entry = aura(
        201,
        vec![slot(
            AuraEffectKind::PeriodicDamage {
                school: School::Fire,
            },
            AuraTrigger::Round,
            30,
        )],
    );
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    add_aura(&mut bf, attacker, defender, 201, 0).unwrap();

    round_end(&mut bf, defender);
    round_end(&mut bf, defender);

    assert_eq!(bf.unit(defender).unwrap().hp(), 940);
    let ticks: Vec<_> = bf
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Damage)
        .collect();
    assert_eq!(ticks.len(), 2);
    assert!(ticks.iter().all(|e| e.flags.contains(ResultFlags::PERIODIC)));
    assert!(ticks.iter().all(|e| e.school == School::Fire));
}

#[test]
fn test_shield_absorbs_then_is_consumed() {
    let entry = aura(
        301,
        vec![slot(AuraEffectKind::Shield, AuraTrigger::BeforeDamageTaken, 150)],
    );
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    add_aura(&mut bf, defender, defender, 301, 0).unwrap();
    let request = CastRequest::new(attacker, SLASH, Some(defender));

    cast_spell(&mut bf, request).unwrap();
    assert_eq!(bf.unit(defender).unwrap().hp(), 1000);
    assert_eq!(aura_count(&bf, defender), 1);

    cast_spell(&mut bf, request).unwrap();
    assert_eq!(bf.unit(defender).unwrap().hp(), 950);
    assert_eq!(aura_count(&bf, defender), 0);
}

#[test]
fn test_removal_during_apply_is_deferred() {
    // An empty shield depletes during its own apply phase.
    let entry = aura(302, vec![slot(AuraEffectKind::Shield, AuraTrigger::Apply, 0)]);
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));

    let handle = add_aura(&mut bf, attacker, defender, 302, 0).unwrap();

    assert_eq!(handle, None);
    assert_eq!(aura_count(&bf, defender), 0);
    let kinds: Vec<_> = bf.events().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::AuraApplied, EventKind::AuraRemoved]);
}

#[test]
fn test_mechanic_immunity_rejects_aura() {
    let mut entry = armor_aura(ARMOR, 50);
    entry.mechanic = Some(Mechanic::Bleed);
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    bf.unit_mut(defender)
        .unwrap()
        .add_immunity(MechanicFlags::BLEED);

    assert_eq!(add_aura(&mut bf, attacker, defender, ARMOR, 0).unwrap(), None);
    assert_eq!(aura_count(&bf, defender), 0);
    assert!(bf.events()[0].flags.contains(ResultFlags::IMMUNE));
}

#[test]
fn test_stun_aura_blocks_casting() {
    let entry = aura(
        401,
        vec![slot(
            AuraEffectKind::ChangeState {
                state: UnitState::STUN,
            },
            AuraTrigger::Apply,
            0,
        )],
    );
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    let handle = add_aura(&mut bf, attacker, defender, 401, 0).unwrap().unwrap();

    let err = cast_spell(&mut bf, CastRequest::new(defender, SLASH, Some(attacker))).unwrap_err();
    assert!(matches!(
        err,
        CombatError::CastRejected(CastError::CasterStateForbidden(SLASH))
    ));

    remove_aura(&mut bf, defender, handle, RemoveMode::DEFAULT);
    assert!(!bf.unit(defender).unwrap().has_state(UnitState::STUN));
    assert!(cast_spell(&mut bf, CastRequest::new(defender, SLASH, Some(attacker))).is_ok());
}

#[test]
fn test_dispel_removes_one_polarity() {
    let mut curse = armor_aura(501, -10);
    curse.harmful = true;
    let mut hex = armor_aura(601, -10);
    hex.harmful = true;
    let blessing = armor_aura(701, 10);
    let (mut bf, attacker, defender) = duel(with_auras(vec![curse, hex, blessing]));
    for id in [501, 601, 701] {
        add_aura(&mut bf, attacker, defender, id, 0).unwrap();
    }

    assert_eq!(dispel(&mut bf, defender, 5, true), 2);
    let combat = bf.unit(defender).unwrap().combat();
    assert_eq!(combat.aura_count(), 1);
    assert!(combat.has_aura(701));
}

#[test]
fn test_outgoing_damage_fix() {
    let mut fix = slot(
        AuraEffectKind::DamageFix { outgoing: true },
        AuraTrigger::BeforeDamageDealt,
        0,
    );
    fix.base_points = Fixed::from_num(0.5);
    let (mut bf, attacker, defender) = duel(with_auras(vec![aura(801, vec![fix])]));
    add_aura(&mut bf, attacker, attacker, 801, 0).unwrap();

    cast_spell(&mut bf, CastRequest::new(attacker, SLASH, Some(defender))).unwrap();
    assert_eq!(bf.unit(defender).unwrap().hp(), 850);

    // Incoming damage to the aura owner is untouched.
    cast_spell(&mut bf, CastRequest::new(defender, SLASH, Some(attacker))).unwrap();
    assert_eq!(bf.unit(attacker).unwrap().hp(), 900);
}

#[test]
fn test_counter_spell_respects_trigger_quota() {
    let mut counter = slot(
        AuraEffectKind::CastSpell {
            spell_id: SLASH,
            target: AuraCastTarget::TriggerSource,
        },
        AuraTrigger::DamageTaken,
        0,
    );
    counter.trigger_count = 1;
    let (mut bf, attacker, defender) = duel(with_auras(vec![aura(901, vec![counter])]));
    add_aura(&mut bf, defender, defender, 901, 0).unwrap();
    let request = CastRequest::new(attacker, SLASH, Some(defender));

    cast_spell(&mut bf, request).unwrap();
    assert_eq!(bf.unit(attacker).unwrap().hp(), 900);

    cast_spell(&mut bf, request).unwrap();
    assert_eq!(bf.unit(attacker).unwrap().hp(), 900);
    assert_eq!(bf.unit(defender).unwrap().hp(), 800);

    // Quotas refill after the configured number of rounds.
    let period = bf.config().aura_quota_reset;
    for _ in 0..period {
        round_end(&mut bf, defender);
    }
    cast_spell(&mut bf, request).unwrap();
    assert_eq!(bf.unit(attacker).unwrap().hp(), 800);
}

#[test]
fn test_mutual_counter_spells_are_bounded() {
    let counter = slot(
        AuraEffectKind::CastSpell {
            spell_id: SLASH,
            target: AuraCastTarget::TriggerSource,
        },
        AuraTrigger::DamageTaken,
        0,
    );
    let mut doc = with_auras(vec![aura(901, vec![counter])]);
    doc.effects[0].kind = crate::data::EffectKind::Damage {
        percent: Fixed::from_num(0.01),
        flat: Fixed::ZERO,
    };
    doc.config.max_spells_per_tick = 1000;
    let (mut bf, attacker, defender) = duel(doc);
    add_aura(&mut bf, attacker, attacker, 901, 0).unwrap();
    add_aura(&mut bf, defender, defender, 901, 0).unwrap();

    cast_spell(&mut bf, CastRequest::new(attacker, SLASH, Some(defender))).unwrap();

    let max_pending = bf.config().max_pending_casts as usize;
    let hits = bf
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Damage)
        .count();
    assert_eq!(hits, max_pending + 1);
}

#[test]
fn test_round_triggered_cast_fires_at_round_end() {
    let volley = slot(
        AuraEffectKind::CastSpell {
            spell_id: SLASH,
            target: AuraCastTarget::Caster,
        },
        AuraTrigger::Round,
        0,
    );
    let (mut bf, attacker, defender) = duel(with_auras(vec![aura(902, vec![volley])]));
    add_aura(&mut bf, attacker, defender, 902, 0).unwrap();
    // Nobody is able to cast on their own.
    bf.unit_mut(attacker).unwrap().add_state(UnitState::STUN);
    bf.unit_mut(defender).unwrap().add_state(UnitState::STUN);

    for _ in 0..5 {
        round_end(&mut bf, defender);
    }

    assert_eq!(bf.pending_len(), 0);
    assert_eq!(bf.unit(attacker).unwrap().hp(), 500);
    let slashes = bf
        .events()
        .iter()
        .filter(|e| e.kind == EventKind::Damage && e.caster == defender)
        .count();
    assert_eq!(slashes, 5);
}

#[test]
fn test_queued_casts_run_after_rejected_cast() {
    let (mut bf, attacker, defender) = duel(document());
    bf.push_pending(crate::battlefield::PendingCast {
        caster: defender,
        spell_id: SLASH,
        target: Some(attacker),
        beat_back: false,
    });
    bf.unit_mut(attacker).unwrap().add_state(UnitState::STUN);

    let rejected = cast_spell(&mut bf, CastRequest::new(attacker, SLASH, Some(defender)));

    assert!(rejected.is_err());
    assert_eq!(bf.pending_len(), 0);
    assert_eq!(bf.unit(attacker).unwrap().hp(), 900);
    assert_eq!(bf.unit(defender).unwrap().hp(), 1000);
}

#[test]
fn test_trigger_only_slots_leave_attributes_untouched() {
    let entry = aura(
        903,
        vec![
            slot(AuraEffectKind::PeriodicHeal, AuraTrigger::Round, 10),
            slot(AuraEffectKind::DamageAbsorb, AuraTrigger::BeforeDamageTaken, 1),
            slot(
                AuraEffectKind::DamageFix { outgoing: true },
                AuraTrigger::BeforeDamageDealt,
                1,
            ),
        ],
    );
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    let before = bf.unit(defender).unwrap().att().clone();

    let handle = add_aura(&mut bf, attacker, defender, 903, 0).unwrap().unwrap();
    assert_eq!(bf.unit(defender).unwrap().att(), &before);

    assert!(remove_aura(&mut bf, defender, handle, RemoveMode::DISPEL));
    assert_eq!(bf.unit(defender).unwrap().att(), &before);
    assert!(bf.unit(defender).unwrap().combat().melee_override().is_none());
}

#[test]
fn test_multi_wrap_takes_new_caster() {
    let mut entry = aura(
        904,
        vec![slot(
            AuraEffectKind::ModAttribute {
                attribute: AttributeKind::Armor,
            },
            AuraTrigger::Apply,
            0,
        )],
    );
    entry.multi_wrap = true;
    entry.max_wraps = 3;
    entry.slots[0].scale_attribute = Some(AttributeKind::Attack);
    entry.slots[0].scale_percent = Fixed::from_num(0.25);
    let (mut bf, attacker, defender) = duel(with_auras(vec![entry]));
    let unit = bf.unit_mut(attacker).unwrap();
    unit.att_mut().set_att_value(AttributeKind::Attack, Fixed::from_num(300));
    unit.recalc();

    let handle = add_aura(&mut bf, defender, defender, 904, 0).unwrap().unwrap();
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(25));

    let rewrapped = add_aura(&mut bf, attacker, defender, 904, 0).unwrap();
    assert_eq!(rewrapped, Some(handle));
    let aura = bf.unit(defender).unwrap().combat().aura(handle).unwrap();
    assert_eq!(aura.caster(), attacker);
    assert_eq!(aura.wraps(), 2);
    assert_eq!(armor_of(&bf, defender), Fixed::from_num(150));
}
