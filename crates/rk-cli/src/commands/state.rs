use colored::Colorize;

use super::Session;

pub fn show(session: &Session, user: &str) -> Result<(), String> {
    let engine = session.engine()?;
    let state = engine.user_state(user);

    if session.json {
        return super::print_json(&state);
    }

    let flag = |on: bool| if on { "yes" } else { "no" };
    println!("  {}", user.bold());
    println!("  fail streak:    {}", state.pity.streak_fail_count);
    println!("  cooldown:       {}", state.pity.cooldown);
    if state.pity.streak_good_count > 0 {
        println!("  hot streak:     {}", state.pity.streak_good_count);
    }
    println!(
        "  death saves:    {} successes, {} failures",
        state.death.successes, state.death.failures
    );
    println!("  advantage:      {}", flag(state.status.next_advantage));
    println!("  disadvantage:   {}", flag(state.status.next_disadvantage));
    println!("  pending damage: {}", state.status.pending_damage);
    println!(
        "  foe advantage:  {}",
        flag(state.status.next_target_has_advantage)
    );
    Ok(())
}

pub fn resave(session: &Session) -> Result<(), String> {
    let engine = session.engine()?;
    engine.save_all().map_err(|e| e.to_string())?;

    let users = engine.store().len();
    if session.json {
        return super::print_json(&serde_json::json!({ "users": users }));
    }
    println!(
        "  saved {users} user{} to {}",
        if users == 1 { "" } else { "s" },
        session.state.display()
    );
    Ok(())
}
