use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::gitlab::types::{Job, MergeRequest, Note, Pipeline, Release};

use super::styling::{bright, cyan, dim, status};
use super::tables::jobs_table;

pub fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Human duration such as `42s`, `3m 05s` or `1h 02m`.
pub fn format_duration(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.max(0.0).round() as u64;
    match total {
        0..=59 => format!("{total}s"),
        60..=3599 => format!("{}m {:02}s", total / 60, total % 60),
        _ => format!("{}h {:02}m", total / 3600, (total % 3600) / 60),
    }
}

/// Order jobs by stage, keeping stages in the order they first ran, then by id.
pub fn sort_jobs_by_stage(jobs: &[Job]) -> Vec<&Job> {
    let mut by_id: Vec<&Job> = jobs.iter().collect();
    by_id.sort_by_key(|job| job.id);

    let mut stages: Vec<&str> = Vec::new();
    for job in by_id.iter().copied() {
        if !stages.contains(&job.stage.as_str()) {
            stages.push(&job.stage);
        }
    }

    by_id.sort_by_key(|job| stages.iter().position(|stage| *stage == job.stage));
    by_id
}

fn add_section_header(output: &mut String, title: &str) {
    let _ = writeln!(output, "{}", bright(title).underlined());
}

fn add_description(output: &mut String, description: Option<&str>) {
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(output, "\n{}", description.trim_end());
    }
}

fn add_field(output: &mut String, name: &str, value: impl std::fmt::Display) {
    let _ = writeln!(output, "{} {value}", dim(format!("{name:>10}:")));
}

/// `jobs` are shown in the order given.
pub fn render_pipeline(pipeline: &Pipeline, jobs: &[&Job]) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} {}",
        bright(format!("Pipeline #{}", pipeline.id)),
        status(&pipeline.status)
    );
    add_field(&mut output, "Ref", &pipeline.ref_);
    add_field(&mut output, "Commit", short_sha(&pipeline.sha));
    if let Some(source) = &pipeline.source {
        add_field(&mut output, "Source", source);
    }
    add_field(&mut output, "Created", format_time(&pipeline.created_at));
    if let Some(duration) = pipeline.duration {
        #[allow(clippy::cast_precision_loss)]
        let seconds = duration as f64;
        add_field(&mut output, "Duration", format_duration(seconds));
    }
    add_field(&mut output, "URL", cyan(&pipeline.web_url));

    if !jobs.is_empty() {
        output.push('\n');
        add_section_header(&mut output, "Jobs");
        let _ = writeln!(output, "{}", jobs_table(jobs));
    }

    output
}

pub fn render_merge_request(mr: &MergeRequest, notes: Option<&[Note]>) -> String {
    let mut output = String::new();

    let draft = if mr.draft { " (draft)" } else { "" };
    let _ = writeln!(
        output,
        "{} {}{draft}",
        bright(format!("!{} {}", mr.iid, mr.title)),
        status(&mr.state)
    );
    add_field(
        &mut output,
        "Branches",
        format!("{} → {}", mr.source_branch, mr.target_branch),
    );
    add_field(&mut output, "Author", format!("@{}", mr.author.username));
    if !mr.assignees.is_empty() {
        let assignees: Vec<String> = mr
            .assignees
            .iter()
            .map(|user| format!("@{}", user.username))
            .collect();
        add_field(&mut output, "Assignees", assignees.join(", "));
    }
    if !mr.labels.is_empty() {
        add_field(&mut output, "Labels", mr.labels.join(", "));
    }
    if let Some(milestone) = &mr.milestone {
        add_field(&mut output, "Milestone", &milestone.title);
    }
    let merge_status = mr
        .detailed_merge_status
        .as_ref()
        .or(mr.merge_status.as_ref());
    if let Some(merge_status) = merge_status {
        add_field(&mut output, "Mergeable", merge_status);
    }
    if mr.has_conflicts {
        add_field(&mut output, "Conflicts", "yes");
    }
    add_field(&mut output, "Updated", format_time(&mr.updated_at));
    add_field(&mut output, "URL", cyan(&mr.web_url));

    add_description(&mut output, mr.description.as_deref());

    if let Some(notes) = notes {
        let comments: Vec<&Note> = notes.iter().filter(|note| !note.system).collect();
        output.push('\n');
        add_section_header(&mut output, &format!("Comments ({})", comments.len()));
        for note in comments {
            let _ = writeln!(
                output,
                "\n{} {}",
                bright(format!("@{}", note.author.username)),
                dim(format_time(&note.created_at))
            );
            for line in note.body.lines() {
                let _ = writeln!(output, "  {line}");
            }
        }
    }

    output
}

pub fn render_release(release: &Release) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} {}",
        bright(&release.tag_name),
        dim(release.name.as_deref().unwrap_or(""))
    );
    let released = release.released_at.unwrap_or(release.created_at);
    add_field(&mut output, "Released", format_time(&released));
    if let Some(author) = &release.author {
        add_field(&mut output, "Author", format!("@{}", author.username));
    }
    if !release.milestones.is_empty() {
        let titles: Vec<&str> = release
            .milestones
            .iter()
            .map(|milestone| milestone.title.as_str())
            .collect();
        add_field(&mut output, "Milestones", titles.join(", "));
    }

    add_description(&mut output, release.description.as_deref());

    output.push('\n');
    add_section_header(&mut output, "Assets");
    if release.assets.links.is_empty() {
        let _ = writeln!(output, "  {}", dim("no linked assets"));
    }
    for link in &release.assets.links {
        let _ = writeln!(output, "  {} {}", link.name, cyan(&link.url));
    }
    for source in &release.assets.sources {
        let _ = writeln!(
            output,
            "  {} {}",
            dim(format!("source ({})", source.format)),
            cyan(&source.url)
        );
    }

    output
}
