//! LLM prompts for the generation pipeline.
//!
//! Prompt wording is data: the pipeline only cares that the expansion
//! prompt yields a JSON array and the newsletter prompt yields the
//! block-structured document the normalizer expects.

use serde::{Deserialize, Serialize};

use crate::types::article::Article;
use crate::types::document::ImagePool;

/// Editorial tone for the generated newsletter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Witty,
}

impl Tone {
    /// Instruction line injected into the newsletter prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Tone::Professional => {
                "Tone: professional, authoritative, and concise. Write with editorial polish."
            }
            Tone::Friendly => {
                "Tone: friendly, approachable, and warm. Write like a letter to a curious friend."
            }
            Tone::Witty => {
                "Tone: witty, humorous, and energetic. Keep the jokes light and the facts straight."
            }
        }
    }
}

/// Prompt for expanding a topic into refined search queries.
pub const EXPAND_TOPIC_PROMPT: &str = r#"You are a research strategist.
Generate 3 search queries that together cover the topic '{topic}' in depth.

The queries must cover these three angles:
1. Latest technical trends and changes
2. Market impact and business insight
3. Concrete applications, data, and statistics

Output ONLY a JSON array of strings.
Example: ["query 1", "query 2", "query 3"]"#;

/// Prompt for distilling raw search context into a refined knowledge base.
pub const REFINE_CONTEXT_PROMPT: &str = r#"You are an information analyst. Topic: '{topic}'

Analyze the article information below:
1. Identify the core theme running through every source.
2. Keep closely related information; drop anything off-topic or contradictory.
3. Output a refined knowledge base, as plain text, for newsletter writing.
Keep every image URL you encounter.

[Raw Context]
{context}"#;

/// Format the topic-expansion prompt.
pub fn format_expand_prompt(topic: &str) -> String {
    EXPAND_TOPIC_PROMPT.replace("{topic}", topic)
}

/// Format the context-refinement prompt.
pub fn format_refine_prompt(topic: &str, raw_context: &str) -> String {
    REFINE_CONTEXT_PROMPT
        .replace("{topic}", topic)
        .replace("{context}", raw_context)
}

/// Format the newsletter-generation prompt.
///
/// Carries the tone instruction, today's date, the refined context, the
/// validated sources (the only URLs the model may link to), the
/// available images, and the block vocabulary.
pub fn format_newsletter_prompt(
    topic: &str,
    tone: Tone,
    today: &str,
    context: &str,
    sources: &[Article],
    images: &ImagePool,
) -> String {
    let mut sources_section = String::new();
    for (i, article) in sources.iter().enumerate() {
        sources_section.push_str(&format!(
            "--- Source {} ---\nTitle: {}\nURL: {}\nContent: {}\n\n",
            i + 1,
            article.title,
            article.url,
            article.content,
        ));
    }

    let mut images_section = String::new();
    for url in images.iter() {
        images_section.push_str(url);
        images_section.push('\n');
    }

    format!(
        r#"You are the senior editor of an insightful newsletter about '{topic}'.

{tone}
Today's date: {today}

[Rules]
1. Convert each source below, in order, into one block (main_story or deep_dive).
2. Link integrity: the `link` field of a block must carry the EXACT URL of its
   source. Never invent or rewrite URLs.
3. Open the body of each block with a short bridge sentence connecting it to
   the previous block.
4. Keep the core insight from the analyzed context as the through-line.
5. Use `image_url` values only from [Available Images]; use null when none fits.

[Analyzed Context]
{context}

[Sources]
{sources}[Available Images]
{images}
[Output Format]
Output ONLY a valid JSON object, no surrounding text. The newsletter is a
sequence of blocks; include at least 10. Block schemas:

1. header: {{ "type": "header", "content": {{ "title": "...", "date": "{today}", "intro": "2-3 sentence greeting" }} }}
2. main_story: {{ "type": "main_story", "content": {{ "title": "...", "image_url": "...", "body": "4-5 paragraphs, markdown", "link": "source URL", "link_text": "Read the full story" }} }}
3. deep_dive: {{ "type": "deep_dive", "content": {{ "title": "Deep dive: ...", "body": "long-form analysis" }} }}
4. quick_hits: {{ "type": "quick_hits", "content": {{ "title": "...", "items": [ {{ "text": "...", "link": "URL" }} ] }} }}
5. tool_spotlight: {{ "type": "tool_spotlight", "content": {{ "name": "...", "description": "...", "link": "URL" }} }}
6. quote: {{ "type": "quote", "content": {{ "text": "...", "author": "..." }} }}
7. stat_box: {{ "type": "stat_box", "content": {{ "value": "85%", "label": "...", "description": "..." }} }}
8. insight: {{ "type": "insight", "content": {{ "text": "closing thought for the reader" }} }}

Overall structure:
{{ "title": "management title", "blocks": [ ... ] }}"#,
        topic = topic,
        tone = tone.instruction(),
        today = today,
        context = context,
        sources = sources_section,
        images = images_section,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_prompt_carries_topic() {
        let prompt = format_expand_prompt("rust async");
        assert!(prompt.contains("'rust async'"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_newsletter_prompt_lists_sources_and_images() {
        let sources = vec![Article::new("A", "https://a.com/1", "excerpt")];
        let images: ImagePool = ["https://a.com/i.jpg"].into_iter().collect();

        let prompt = format_newsletter_prompt(
            "topic",
            Tone::Friendly,
            "2026-08-06",
            "analyzed context",
            &sources,
            &images,
        );

        assert!(prompt.contains("--- Source 1 ---"));
        assert!(prompt.contains("URL: https://a.com/1"));
        assert!(prompt.contains("https://a.com/i.jpg"));
        assert!(prompt.contains(Tone::Friendly.instruction()));
        assert!(prompt.contains("Today's date: 2026-08-06"));
    }

    #[test]
    fn test_tone_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Tone::Witty).unwrap(), "\"witty\"");
        let tone: Tone = serde_json::from_str("\"professional\"").unwrap();
        assert_eq!(tone, Tone::Professional);
    }
}
