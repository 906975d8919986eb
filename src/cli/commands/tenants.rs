//! Template and letterhead commands.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::lifecycle::IncomingFile;
use crate::models::{Actor, LetterTemplate, TenantProfile};
use crate::repository::{TemplateSource, TenantDirectory};
use crate::services::Services;

pub async fn cmd_template_put(
    settings: &Settings,
    tenant: &str,
    id: &str,
    name: &str,
    category: &str,
    file: &Path,
) -> anyhow::Result<()> {
    let body = tokio::fs::read_to_string(file).await?;
    let services = Services::from_settings(settings).await?;

    let mut template = LetterTemplate::new(tenant, id, name, category, &body);
    if let Some(existing) = services.templates.template(tenant, id).await? {
        template.created_at = existing.created_at;
    }
    services.templates.save(&template).await?;

    println!("{} Saved template {}", style("✓").green(), style(id).bold());
    if template.fields.is_empty() {
        println!("  No {{field}} placeholders found");
    } else {
        println!("  Fields: {}", template.fields.join(", "));
    }
    Ok(())
}

pub async fn cmd_template_list(settings: &Settings, tenant: &str) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let templates = services.templates.list(tenant).await?;
    if templates.is_empty() {
        println!("{} No templates for {}", style("!").yellow(), tenant);
        return Ok(());
    }
    for template in templates {
        println!(
            "  {} {} ({})",
            style(&template.id).bold(),
            template.name,
            template.category
        );
    }
    Ok(())
}

/// Set the display name and, optionally, the letterhead markup. An
/// existing logo is kept.
pub async fn cmd_letterhead_set(
    settings: &Settings,
    tenant: &str,
    name: &str,
    markup: Option<&Path>,
) -> anyhow::Result<()> {
    let markup = match markup {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };
    let services = Services::from_settings(settings).await?;

    let mut profile = services
        .tenants
        .profile(tenant)
        .await?
        .unwrap_or_else(|| TenantProfile::new(tenant, name));
    profile.display_name = name.to_string();
    if markup.is_some() {
        profile.letterhead_markup = markup;
    }
    services.tenants.save(&profile).await?;

    println!("{} Saved letterhead for {}", style("✓").green(), tenant);
    if profile.logo.is_none() {
        println!("  Upload a logo with `letters letterhead logo` before approving letters");
    }
    Ok(())
}

pub async fn cmd_letterhead_logo(
    settings: &Settings,
    tenant: &str,
    file: &Path,
    actor: &Actor,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file).await?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "logo".to_string());
    let services = Services::from_settings(settings).await?;

    services
        .lifecycle
        .replace_letterhead_logo(tenant, IncomingFile::new(bytes, file_name), actor)
        .await?;
    println!("{} Replaced letterhead logo for {}", style("✓").green(), tenant);
    Ok(())
}
