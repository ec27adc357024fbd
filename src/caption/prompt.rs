//! Prompt 构建
//!
//! 纯文本变换：给定校验后的字段和 nonce，输出确定的 prompt。

use std::sync::Arc;

use super::types::{CaptionInput, CaptionLength, FieldContext, Language, VibeCategory};

const TECH_KEYWORDS: &[&str] = &[
    "ai",
    "machine learning",
    "tech",
    "software",
    "coding",
    "development",
    "startup",
    "innovation",
];
const BUSINESS_KEYWORDS: &[&str] = &[
    "business",
    "entrepreneur",
    "leadership",
    "management",
    "strategy",
    "marketing",
];
const ACADEMIC_KEYWORDS: &[&str] = &[
    "research",
    "study",
    "university",
    "academic",
    "education",
    "learning",
];

/// Prompt 中使用的 nonce 来源
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u32;
}

/// 随机 nonce，范围 [1000, 9999]
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn next_nonce(&self) -> u32 {
        fastrand::u32(1000..=9999)
    }
}

/// 固定 nonce（测试用）
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedNonce(pub u32);

#[cfg(test)]
impl NonceSource for FixedNonce {
    fn next_nonce(&self) -> u32 {
        self.0
    }
}

/// 长度指引
pub fn length_guidelines(length: CaptionLength) -> &'static str {
    match length {
        CaptionLength::Short => {
            "Keep it concise and punchy (100-200 words). Focus on 1-2 key points."
        }
        CaptionLength::Medium => {
            "Provide good detail while staying engaging (200-400 words). Cover 2-3 key points."
        }
        CaptionLength::Long => {
            "Create a comprehensive post (400-600 words). Cover multiple points with detailed insights."
        }
    }
}

/// 按关键词命中数检测领域上下文
///
/// 命中数最高者胜出，平局按 technology > business > academic 取前者，
/// 全部为 0 时返回 General。关键词为子串匹配。
pub fn detect_field_context(event_type: &str, key_learnings: &str) -> FieldContext {
    let combined = format!("{} {}", event_type, key_learnings).to_lowercase();
    let score = |keywords: &[&str]| keywords.iter().filter(|k| combined.contains(*k)).count();

    let candidates = [
        (FieldContext::Technology, score(TECH_KEYWORDS)),
        (FieldContext::Business, score(BUSINESS_KEYWORDS)),
        (FieldContext::Academic, score(ACADEMIC_KEYWORDS)),
    ];

    let mut best = (FieldContext::General, 0);
    for (context, hits) in candidates {
        // 严格大于才替换，平局保留优先级更高的
        if hits > best.1 {
            best = (context, hits);
        }
    }
    best.0
}

/// Tanglish 语言附加指令
fn language_instructions(language: Language) -> &'static str {
    match language {
        Language::English => "",
        Language::Tanglish => {
            "- Mix English with Tamil words naturally (like 'vera level', 'semma', 'thala', etc.)
- Use casual Indian English expressions
- Keep it authentic and relatable to Indian audience
"
        }
    }
}

/// 渲染完整 prompt
pub fn render_prompt(input: &CaptionInput, nonce: u32) -> String {
    let vibe = VibeCategory::from_score(input.vibe);
    let field_context = detect_field_context(&input.event_type, &input.key_learnings);

    format!(
        "You are an expert LinkedIn content creator specializing in viral, engaging posts. \
Create a compelling LinkedIn caption that will maximize engagement and reach.

**EVENT DETAILS:**
- Event/Occasion: {event_name}
- Type: {event_type}
- Location: {location}
- Key People: {speakers}
- Highlights/Learnings: {key_learnings}

**STYLE REQUIREMENTS:**
- Vibe: {vibe_title} (Score: {vibe_score}/100)
- Length: {length} - {length_guide}
- Language: {language}
{language_instructions}- Field Context: {field_label}

**STRUCTURE REQUIREMENTS:**
1. **HOOK** (First 1-2 lines): Create an attention-grabbing opener that makes people want to read more
2. **STORY/CONTEXT** (2-3 lines): Brief context about the event/experience
3. **KEY INSIGHTS** (Main body): Share 2-3 valuable takeaways or learnings
4. **PERSONAL TOUCH** (1-2 lines): Add personal reflection or emotion
5. **CALL TO ACTION** (Final line): Encourage engagement or connection
6. **HASHTAGS**: 5-8 relevant hashtags

**ENGAGEMENT OPTIMIZATION:**
- Use storytelling elements
- Include specific, actionable insights
- Add relevant emojis (but don't overuse)
- Create curiosity gaps
- Use power words and emotional triggers
- Include industry-relevant keywords naturally

**CRITICAL REQUIREMENTS:**
- Make it unique and original (avoid generic templates)
- Ensure high professional value
- Include specific details from the provided information
- Make people want to engage (like, comment, share)
- Optimize for LinkedIn's algorithm

**AVOID:**
- Generic motivational quotes
- Overly salesy language
- Excessive emoji use
- Clickbait without substance

Generate a caption that would genuinely get high engagement and help establish thought leadership in the {field_label} space.

**UNIQUENESS REQUIREMENT:**
Add these elements to ensure uniqueness (random seed: {nonce}):
- Vary the opening style from your usual patterns
- Choose a different emotional angle or perspective
- Use alternative vocabulary and sentence structures
- Include a unique insight or angle not commonly used
",
        event_name = input.event_name,
        event_type = input.event_type,
        location = input.location,
        speakers = input.speakers,
        key_learnings = input.key_learnings,
        vibe_title = vibe.title(),
        vibe_score = input.vibe,
        length = input.length.as_str(),
        length_guide = length_guidelines(input.length),
        language = input.language.title(),
        language_instructions = language_instructions(input.language),
        field_label = field_context.label(),
        nonce = nonce,
    )
}

/// Prompt 构建器，持有注入的 nonce 来源
#[derive(Clone)]
pub struct PromptBuilder {
    nonce: Arc<dyn NonceSource>,
}

impl PromptBuilder {
    pub fn new(nonce: Arc<dyn NonceSource>) -> Self {
        Self { nonce }
    }

    pub fn build(&self, input: &CaptionInput) -> String {
        render_prompt(input, self.nonce.next_nonce())
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(Arc::new(RandomNonce))
    }
}
