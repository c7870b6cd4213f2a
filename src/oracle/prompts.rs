use crate::models::{ChunkSummary, SessionMemory, SessionStats};
use crate::report::ReportMetrics;
use crate::utils::text::sanitize_title;

const PERSONA: &str = "You are Leonardo da Vinci, acting as a demanding but fair mentor \
who watches over a person's work session.";

/// Instruction for scoring one chunk. The oracle rewrites the rolling
/// summary, picks an emotion from the recent-distraction bands, anchors its
/// score on the session-wide ratio, and answers with JSON only. Window
/// titles are masked before they are sent.
pub fn chunk_prompt(
    chunk: &ChunkSummary,
    previous_summary: &str,
    goal: &str,
    emotion_bands: &str,
    summary_max_chars: usize,
) -> String {
    let windows = if chunk.unique_windows.is_empty() {
        "(no active window)".to_string()
    } else {
        chunk
            .unique_windows
            .iter()
            .map(|window| sanitize_title(window))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let anchor = 100 - chunk.global_distraction_ratio.min(100);

    format!(
        "{PERSONA}
The person's declared goal: \"{goal}\"

Summary of the session so far:
{previous_summary}

Last {duration} seconds:
- Windows used: {windows}
- Recent distraction (this window only): {recent}%
- Global distraction (whole session): {global}%

Tasks:
1. Rewrite the summary of the session so far in at most {summary_max_chars} characters, folding in the last {duration} seconds.
2. Choose exactly one emotion using the RECENT distraction percentage:
{emotion_bands}
3. Give a focus_score from 0 to 100. Start from {anchor} (100 minus the global distraction) and adjust by at most 10 points based on how well the windows match the goal.
4. Write one short comment (max 25 words) in character, addressed to the person.

Reply with a single JSON object and nothing else:
{{\"summary\": \"...\", \"emotion\": \"...\", \"focus_score\": 0, \"comment\": \"...\"}}",
        duration = chunk.duration_sec,
        recent = chunk.recent_distraction_ratio,
        global = chunk.global_distraction_ratio,
    )
}

/// Instruction for the end-of-session narrative. All numbers are handed in
/// literally; the generator is told not to produce any others.
pub fn report_prompt(
    memory: &SessionMemory,
    role: &str,
    stats: &SessionStats,
    metrics: &ReportMetrics,
) -> String {
    let top_apps = if stats.top_apps.is_empty() {
        "- (none recorded)".to_string()
    } else {
        stats
            .top_apps
            .iter()
            .map(|app| format!("- {}: {} s", sanitize_title(&app.name), app.seconds))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let recent_windows = if stats.recent_windows.is_empty() {
        "(none recorded)".to_string()
    } else {
        stats
            .recent_windows
            .iter()
            .map(|window| sanitize_title(window))
            .collect::<Vec<_>>()
            .join(" -> ")
    };
    let most_clicked = stats
        .most_clicked
        .as_ref()
        .map(|app| format!("{} ({} clicks)", sanitize_title(&app.name), app.count))
        .unwrap_or_else(|| "(none recorded)".to_string());

    format!(
        "{PERSONA}
Write the final report of a work session for a person whose goal was: \"{role}\".

Use ONLY these numbers. Do not compute, estimate, or invent any other figure.
- Final focus score: {final_score}/100 (grade {grade})
- Average / best / worst chunk score: {avg:.1} / {max} / {min}
- Trend: {trend}
- Deep work: {deep:.1} minutes
- Distraction events: {events}
- Chunks observed: {iterations}
- Session length: {duration} s, window switches: {switches}, pauses: {pauses}
- Key presses: {keys}, mouse clicks: {clicks}
- Time distracted: {distracted} s
Top applications by foreground time:
{top_apps}
Most clicked: {most_clicked}
Last windows, oldest first: {recent_windows}

What you observed during the session:
{summary}

Write Markdown with these sections: ## Verdict (2 sentences), ## Distractions (up to 3 bullets), \
## Recommendations (3 bullets), ## Parting words (1-2 sentences, in character).",
        final_score = metrics.final_score,
        grade = metrics.grade,
        avg = metrics.average_score,
        max = metrics.max_score,
        min = metrics.min_score,
        trend = metrics.trend.as_str(),
        deep = metrics.deep_work_minutes,
        events = metrics.distraction_events,
        iterations = metrics.total_iterations,
        duration = stats.duration_seconds,
        switches = stats.total_switches,
        pauses = stats.pause_count,
        keys = stats.key_presses,
        clicks = stats.mouse_clicks,
        distracted = stats.total_distraction_time,
        summary = memory.summary_so_far,
    )
}

pub fn advice_prompt(goal: &str) -> String {
    format!(
        "{PERSONA}
The person is about to start a work session with this goal: \"{goal}\".
Give one piece of practical advice for staying focused on it, in character, in at most 40 words. \
Reply with the advice only."
    )
}
