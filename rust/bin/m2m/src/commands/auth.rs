//! Login / logout / whoami.

use std::io::Write;

use anyhow::Result;

use super::Context;

pub fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub async fn login(ctx: &Context, user: &str, password: &str) -> Result<()> {
    let session = ctx
        .auth()?
        .login(user, password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "userId": session.user_id,
            "user": session.user,
        }))?);
    } else {
        let name = session.user.as_ref().map(|u| u.name.as_str()).unwrap_or(user);
        println!("Logged in as {} ({}).", name, session.user_id);
    }
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.auth()?.logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    let Some(user) = ctx.auth()?.restore_session().await? else {
        anyhow::bail!("Not logged in. Run `m2m login`.");
    };

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("{} <{}>", user.name, user.email);
        if let Some(ref handle) = user.caller().handle {
            println!("handle:  @{}", handle);
        }
        println!("id:      {}", user.id);
        println!("coins:   {:.2}", user.coin_balance);
        println!("earned:  {:.2} (this week {:.2})", user.total_earnings, user.weekly_earnings);
    }
    Ok(())
}
