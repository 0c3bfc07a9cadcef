//! Integration tests for the gesture lock and focus handling
//!
//! Calls made while locked must replay once, in call order across all
//! instances; focus loss must survive arbitrarily long suspensions.

use soul_channels::{
    Clock, ManagerSettings, ManualClock, Outcome, PlayConfig, PlaybackHandle, SoundConfig,
    SoundEvent, SoundEventKind, SoundId, SoundManager, SoundState, VirtualHandle,
};

// ===== Test Helpers =====

fn locked_settings() -> ManagerSettings {
    ManagerSettings {
        locked: true,
        ..ManagerSettings::default()
    }
}

fn setup(
    settings: ManagerSettings,
    channels: usize,
) -> (SoundManager, ManualClock, Vec<VirtualHandle>) {
    let clock = ManualClock::starting_at(1000.0);
    let mut manager = SoundManager::with_clock(settings, clock.clone());
    let handles = VirtualHandle::pool(8.0, channels);
    manager
        .insert_audio("voice", handles.iter().map(VirtualHandle::boxed).collect())
        .unwrap();
    (manager, clock, handles)
}

fn state(manager: &SoundManager, id: SoundId) -> SoundState {
    manager.sound(id).map_or(SoundState::Idle, |s| s.state())
}

// ===== Gesture Lock =====

#[test]
fn locked_calls_are_deferred_without_side_effects() {
    let (mut manager, _, handles) = setup(locked_settings(), 2);
    let id = manager.add("voice", SoundConfig::default()).unwrap();

    let mut sound = manager.sound_mut(id).unwrap();
    assert_eq!(sound.play(None, PlayConfig::default()), Outcome::Deferred);
    assert_eq!(sound.stop(), Outcome::Deferred);
    assert_eq!(sound.state(), SoundState::Idle);

    assert!(handles.iter().all(|h| h.is_paused() && h.play_count() == 0));
    assert!(!manager.has_pending_events());
    assert_eq!(manager.queued_actions(), 2);
}

#[test]
fn locked_property_write_converges_after_unlock() {
    let (mut manager, _, handles) = setup(ManagerSettings::default(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(id).unwrap().play(None, PlayConfig::default());
    manager.drain_events();
    manager.lock();

    let mut sound = manager.sound_mut(id).unwrap();
    assert_eq!(sound.set_volume(0.5), Outcome::Deferred);
    assert_eq!(sound.volume(), 0.5);
    assert_eq!(handles[0].volume(), 1.0);

    manager.unlock();

    assert_eq!(handles[0].volume(), 0.5);
    assert_eq!(
        manager.drain_events(),
        vec![SoundEvent::new(id, SoundEventKind::Volume(0.5))]
    );
}

#[test]
fn replay_follows_call_order_across_instances() {
    let (mut manager, clock, handles) = setup(locked_settings(), 2);
    let first = manager.add("voice", SoundConfig::default()).unwrap();
    let second = manager.add("voice", SoundConfig::default()).unwrap();

    manager.sound_mut(first).unwrap().set_volume(0.5);
    clock.advance(10.0);
    manager
        .sound_mut(second)
        .unwrap()
        .play(None, PlayConfig::default());
    clock.advance(10.0);
    manager
        .sound_mut(first)
        .unwrap()
        .play(None, PlayConfig::default());
    clock.advance(10.0);
    manager.sound_mut(second).unwrap().set_mute(true);

    manager.unlock();

    let order: Vec<(SoundId, SoundEventKind)> = manager
        .drain_events()
        .into_iter()
        .map(|event| (event.sound, event.kind))
        .collect();
    assert_eq!(
        order,
        vec![
            (first, SoundEventKind::Volume(0.5)),
            (second, SoundEventKind::Play),
            (first, SoundEventKind::Play),
            (second, SoundEventKind::Mute(true)),
        ]
    );

    assert_eq!(state(&manager, first), SoundState::Playing);
    assert_eq!(state(&manager, second), SoundState::Playing);
    // second started first, so it holds slot 0
    assert!(handles[0].muted());
    assert_eq!(handles[1].volume(), 0.5);
    assert_eq!(manager.queued_actions(), 0);
}

#[test]
fn queue_is_consumed_once() {
    let (mut manager, _, handles) = setup(locked_settings(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(id).unwrap().play(None, PlayConfig::default());

    manager.unlock();
    manager.sound_mut(id).unwrap().stop();
    manager.lock();
    manager.unlock();

    assert_eq!(handles[0].play_count(), 1);
    assert_eq!(state(&manager, id), SoundState::Idle);
}

#[test]
fn relocking_queues_again() {
    let (mut manager, _, _) = setup(ManagerSettings::default(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.lock();
    assert!(manager.is_locked());

    let outcome = manager.sound_mut(id).unwrap().play(None, PlayConfig::default());
    assert_eq!(outcome, Outcome::Deferred);

    manager.unlock();
    assert_eq!(state(&manager, id), SoundState::Playing);
}

#[test]
fn destroyed_instance_is_not_replayed() {
    let (mut manager, _, handles) = setup(locked_settings(), 1);
    let gone = manager.add("voice", SoundConfig::default()).unwrap();
    let kept = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(gone).unwrap().play(None, PlayConfig::default());
    manager.sound_mut(kept).unwrap().set_volume(0.2);

    assert!(manager.remove(gone));
    assert_eq!(manager.queued_actions(), 1);
    manager.unlock();

    assert_eq!(handles[0].play_count(), 0);
    let events = manager.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sound, kept);
}

#[test]
fn rejected_replay_of_one_shot_destroys_it() {
    let settings = ManagerSettings {
        allow_override: false,
        ..ManagerSettings::default()
    };
    let (mut manager, _, handles) = setup(settings, 1);
    let holder = manager.add("voice", SoundConfig::default()).unwrap();
    manager
        .sound_mut(holder)
        .unwrap()
        .play(None, PlayConfig::default());
    manager.lock();

    let (one_shot, outcome) = manager
        .play_once("voice", None, PlayConfig::default())
        .unwrap();
    assert_eq!(outcome, Outcome::Deferred);
    assert_eq!(manager.len(), 2);

    manager.unlock();

    assert!(manager.sound(one_shot).is_none());
    assert_eq!(manager.len(), 1);
    assert_eq!(state(&manager, holder), SoundState::Playing);
    assert_eq!(handles[0].play_count(), 1);
}

#[test]
fn delayed_play_queued_while_locked_counts_from_unlock() {
    let (mut manager, clock, _) = setup(locked_settings(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager
        .sound_mut(id)
        .unwrap()
        .play(None, PlayConfig::default().with_delay(1.0));

    clock.advance(5000.0);
    manager.unlock();

    let start_time = manager.sound(id).unwrap().channel().start_time();
    assert_eq!(start_time, clock.now_ms() + 1000.0);
    assert_eq!(state(&manager, id), SoundState::DelayedPending);
}

// ===== Focus =====

#[test]
fn blur_pauses_and_focus_resumes_from_position() {
    let (mut manager, clock, handles) = setup(ManagerSettings::default(), 2);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(id).unwrap().play(None, PlayConfig::default());
    handles[0].advance(2.5);
    manager.drain_events();

    manager.on_blur();
    assert_eq!(state(&manager, id), SoundState::Paused);
    assert!(handles[0].is_paused());
    assert_eq!(manager.sound(id).unwrap().handle_slot(), None);

    // Long suspension, no ticks
    clock.advance(60_000.0);
    manager.on_focus();

    assert_eq!(state(&manager, id), SoundState::Playing);
    let slot = manager.sound(id).unwrap().handle_slot().unwrap();
    assert_eq!(handles[slot].current_time(), 2.5);
    assert!(!handles[slot].is_paused());
    assert!(!manager.has_pending_events());
}

#[test]
fn blur_keeps_remaining_delay() {
    let (mut manager, clock, _) = setup(ManagerSettings::default(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager
        .sound_mut(id)
        .unwrap()
        .play(None, PlayConfig::default().with_delay(2.0));

    clock.advance(500.0);
    manager.on_blur();
    assert_eq!(manager.sound(id).unwrap().base().current_config().delay, 1.5);

    clock.advance(10_000.0);
    manager.on_focus();

    let start_time = manager.sound(id).unwrap().channel().start_time();
    assert_eq!(start_time, clock.now_ms() + 1500.0);
    assert_eq!(state(&manager, id), SoundState::DelayedPending);
}

#[test]
fn focus_only_resumes_sounds_paused_by_blur() {
    let (mut manager, _, _) = setup(ManagerSettings::default(), 3);
    let playing = manager.add("voice", SoundConfig::default()).unwrap();
    let paused = manager.add("voice", SoundConfig::default()).unwrap();
    let idle = manager.add("voice", SoundConfig::default()).unwrap();
    manager
        .sound_mut(playing)
        .unwrap()
        .play(None, PlayConfig::default());
    manager
        .sound_mut(paused)
        .unwrap()
        .play(None, PlayConfig::default());
    manager.sound_mut(paused).unwrap().pause();

    manager.on_blur();
    manager.on_focus();

    assert_eq!(state(&manager, playing), SoundState::Playing);
    assert_eq!(state(&manager, paused), SoundState::Paused);
    assert_eq!(state(&manager, idle), SoundState::Idle);
}

#[test]
fn stop_between_blur_and_focus_wins() {
    let (mut manager, _, _) = setup(ManagerSettings::default(), 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(id).unwrap().play(None, PlayConfig::default());

    manager.on_blur();
    manager.sound_mut(id).unwrap().stop();
    manager.on_focus();

    assert_eq!(state(&manager, id), SoundState::Idle);
}

#[test]
fn blur_is_ignored_when_disabled() {
    let settings = ManagerSettings {
        pause_on_blur: false,
        ..ManagerSettings::default()
    };
    let (mut manager, _, handles) = setup(settings, 1);
    let id = manager.add("voice", SoundConfig::default()).unwrap();
    manager.sound_mut(id).unwrap().play(None, PlayConfig::default());

    manager.on_blur();

    assert_eq!(state(&manager, id), SoundState::Playing);
    assert!(!handles[0].is_paused());
}
