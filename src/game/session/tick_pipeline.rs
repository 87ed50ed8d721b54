use super::GameSession;

/// Executes simulation phases for one tick.
/// Ordered so gameplay forces land in the same physics step that
/// the gesture produced them in:
/// commands -> trackers -> gestures -> forces -> agents -> physics -> contacts -> cleanup.
pub(super) fn run_tick_phases(session: &mut GameSession, dt: f32) {
    // Drain queued commands; a manual throw only arms the gesture check.
    let manual_throw = session.apply_commands();

    // Sample the head and face before anything reads them.
    session.record_trackers(dt);

    // Nod grabs, jerk throws.
    session.process_gestures(dt, manual_throw);

    // Gravity substitute, hover seek and throw acceleration.
    session.apply_levitation_forces(dt);

    // Agents walk before the step so the query pipeline sees where they ended up.
    session.steer_agents(dt);
    session.update_clusters();

    session.physics.step(dt);

    // Kills need post-step velocities and positions.
    session.physics.update_query_pipeline();
    session.resolve_lethal_contacts();

    session.update_dead_bodies();
    session.run_deferred();

    session.combo.tick(dt);
}
