//! Account commands: sign up, sign in, password reset.
//!
//! Commands that yield a token print only the token on stdout, so the
//! output can go straight into `FRESHCART_TOKEN`.

use freshcart_core::Email;
use freshcart_storefront::forms::SignUpForm;
use secrecy::SecretString;

use super::{CliError, Shop};

#[allow(clippy::print_stdout)]
pub async fn sign_up(
    shop: &Shop,
    name: String,
    email: String,
    password: String,
    phone: String,
) -> Result<(), CliError> {
    let password = SecretString::from(password);
    let request = SignUpForm {
        name,
        email,
        re_password: password.clone(),
        password,
        phone,
    }
    .validate()?;

    let response = shop.client.sign_up(&request).await?;
    tracing::info!(name = %response.user.name, "Account created");
    println!("{}", response.token);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn login(shop: &Shop, email: &Email, password: String) -> Result<(), CliError> {
    let password = SecretString::from(password);
    let user = shop
        .storefront
        .sign_in(&shop.client, email, &password)
        .await?;
    tracing::info!(name = %user.name, "Signed in");

    if let Some(token) = shop.storefront.session().token() {
        println!("{}", token.expose());
    }
    Ok(())
}

pub async fn forgot_password(shop: &Shop, email: &Email) -> Result<(), CliError> {
    shop.client.forgot_password(email).await?;
    tracing::info!("Reset code sent, check your inbox");
    Ok(())
}

pub async fn verify_code(shop: &Shop, code: &str) -> Result<(), CliError> {
    shop.client.verify_reset_code(code).await?;
    tracing::info!("Code accepted, set a new password with `freshcart password reset`");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn reset_password(
    shop: &Shop,
    email: &Email,
    new_password: String,
) -> Result<(), CliError> {
    let token = shop
        .client
        .reset_password(email, &SecretString::from(new_password))
        .await?;
    tracing::info!("Password changed");
    println!("{}", token.expose());
    Ok(())
}
