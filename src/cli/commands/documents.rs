//! Document lifecycle commands.

use std::path::Path;

use chrono::{Datelike, Utc};
use console::style;

use crate::config::Settings;
use crate::lifecycle::{format_serial_number, ArchiveMetadata, IncomingFile};
use crate::models::{Actor, DocumentRecord, DocumentStatus, FormData};
use crate::repository::{DocumentFilter, DocumentStore};
use crate::services::Services;

fn status_label(record: &DocumentRecord) -> String {
    match record.status {
        Some(DocumentStatus::Pending) => style("pending").yellow().to_string(),
        Some(DocumentStatus::Approved) => style("approved").green().to_string(),
        Some(DocumentStatus::Rejected) => style("rejected").red().to_string(),
        None => style("archived").dim().to_string(),
    }
}

fn print_summary(record: &DocumentRecord) {
    println!(
        "  {} {} [{}]",
        style(&record.serial_number).bold(),
        record.title,
        status_label(record)
    );
    println!("    id: {}", style(&record.id).dim());
}

/// Archive an existing letter file.
pub async fn cmd_archive(
    settings: &Settings,
    tenant: &str,
    metadata: ArchiveMetadata,
    file: &Path,
    content_type: Option<String>,
    actor: &Actor,
) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let bytes = tokio::fs::read(file).await?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "letter".to_string());

    let mut incoming = IncomingFile::new(bytes, file_name);
    if let Some(content_type) = content_type {
        incoming = incoming.with_content_type(content_type);
    }

    let record = services
        .lifecycle
        .archive_existing_document(tenant, metadata, incoming, actor)
        .await?;
    println!("{} Archived document", style("✓").green());
    print_summary(&record);
    Ok(())
}

/// Request a generated letter.
pub async fn cmd_request(
    settings: &Settings,
    tenant: &str,
    template: &str,
    form: FormData,
    actor: &Actor,
) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let record = services
        .lifecycle
        .request_generation(tenant, template, form, actor)
        .await?;
    println!("{} Requested letter", style("✓").green());
    print_summary(&record);
    Ok(())
}

pub async fn cmd_approve(
    settings: &Settings,
    tenant: &str,
    id: &str,
    actor: &Actor,
) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let record = services
        .lifecycle
        .generate_and_approve(tenant, id, actor)
        .await?;
    println!("{} Approved letter", style("✓").green());
    print_summary(&record);
    Ok(())
}

pub async fn cmd_reject(
    settings: &Settings,
    tenant: &str,
    id: &str,
    actor: &Actor,
) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let record = services.lifecycle.reject(tenant, id, actor).await?;
    println!("{} Rejected letter", style("✓").green());
    print_summary(&record);
    Ok(())
}

/// Show one document and, if it has a file, a short-lived link to it.
pub async fn cmd_show(settings: &Settings, tenant: &str, id: &str) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let record = services.documents.find_by_id(tenant, id).await?;

    println!("{}", style(&record.serial_number).bold());
    println!("  Title:     {}", record.title);
    println!("  Category:  {}", record.category);
    println!("  Date:      {}", record.document_date);
    println!("  Direction: {}", record.direction);
    println!("  Status:    {}", status_label(&record));
    println!("  Created:   {} by {}", record.created_at, record.created_by);
    if let (Some(by), Some(at)) = (&record.approved_by, &record.approved_at) {
        println!("  Approved:  {} by {}", at, by);
    }
    if let Some(form) = &record.rendered_form_data {
        for (key, value) in form {
            println!("  {:>10} = {}", style(key).dim(), value);
        }
    }

    if record.storage_reference.is_some() {
        match services.lifecycle.download_url(tenant, id, None).await {
            Ok(link) => println!("  File:      {}", link.url),
            Err(e) => println!("  {} File unavailable: {}", style("!").yellow(), e.public_message()),
        }
    }
    Ok(())
}

pub async fn cmd_list(
    settings: &Settings,
    tenant: &str,
    status: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let status = match status {
        Some(s) => Some(
            DocumentStatus::from_str(s).ok_or_else(|| anyhow::anyhow!("unknown status '{}'", s))?,
        ),
        None => None,
    };
    let services = Services::from_settings(settings).await?;
    let filter = DocumentFilter {
        status,
        limit: Some(limit),
        ..Default::default()
    };
    let records = services.documents.list(tenant, &filter).await?;

    if records.is_empty() {
        println!("{} No documents", style("!").yellow());
        return Ok(());
    }
    for record in &records {
        print_summary(record);
    }
    Ok(())
}

pub async fn cmd_discard(settings: &Settings, tenant: &str, id: &str) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    services.lifecycle.discard_document(tenant, id).await?;
    println!("{} Discarded document {}", style("✓").green(), id);
    Ok(())
}

/// Print the serial number the next request would get, without allocating it.
pub async fn cmd_next_serial(
    settings: &Settings,
    tenant: &str,
    year: Option<i32>,
) -> anyhow::Result<()> {
    let year = year.unwrap_or_else(|| Utc::now().year());
    let services = Services::from_settings(settings).await?;
    let current = services
        .sequences
        .current_value(tenant, &year.to_string())
        .await?;
    println!("{}", format_serial_number(current + 1, tenant, year));
    Ok(())
}
