//! Registration, profiles and follows.

use anyhow::Result;
use m2m_client::{RegisterRequest, User};

use super::Context;

pub async fn register(ctx: &Context, form: &RegisterRequest) -> Result<()> {
    let message = ctx
        .auth()?
        .register(form)
        .await
        .map_err(|e| anyhow::anyhow!("Registration failed: {}", e))?;
    println!("{}", message);
    println!("Run `m2m login --user {}` to sign in.", form.email);
    Ok(())
}

pub async fn profile(ctx: &Context, user_id: &str) -> Result<()> {
    let users = ctx.users()?;
    let user = users.profile(user_id).await?;
    let following = if ctx.auth()?.is_signed_in() {
        Some(users.is_following(user_id).await?)
    } else {
        None
    };

    if ctx.json() {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "user": user,
            "following": following,
        }))?);
    } else {
        print_profile(&user, following);
    }
    Ok(())
}

pub async fn follow(ctx: &Context, user_id: &str, follow: bool) -> Result<()> {
    if !ctx.auth()?.is_signed_in() {
        anyhow::bail!("Not logged in. Run `m2m login`.");
    }
    let users = ctx.users()?;
    if follow {
        users.follow(user_id).await?;
        println!("Following {}.", user_id);
    } else {
        users.unfollow(user_id).await?;
        println!("Unfollowed {}.", user_id);
    }
    Ok(())
}

fn print_profile(user: &User, following: Option<bool>) {
    println!("{} ({})", user.display_name.as_deref().unwrap_or(&user.name), user.id);
    if let Some(ref handle) = user.caller().handle {
        println!("handle:     @{}", handle);
    }
    if let Some(ref bio) = user.bio {
        if !bio.is_empty() {
            println!("bio:        {}", bio);
        }
    }
    println!("followers:  {}", user.follower_count);
    println!("following:  {}", user.following_count);
    if user.is_content_creator {
        println!("creator:    yes");
    }
    match following {
        Some(true) => println!("\nYou follow this user."),
        Some(false) => println!("\nYou do not follow this user."),
        None => {}
    }
}
