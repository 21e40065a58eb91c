// Shared prompt fragments. Stage-specific prompts live in pipeline/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every stage that rewrites résumé content.
pub const FACTUAL_INSTRUCTION: &str = "\
    CRITICAL: The resume must remain factual. Do NOT invent new experiences, \
    skills, projects or metrics. Only rephrase and reorganize existing information, \
    plus anything the candidate supplied explicitly in their own words.";

/// Single-page content rules shared by the optimizer and the gap filler.
pub const CONTENT_RULES: &str = "\
    Content Rules:
    - No Summary or Objective sections.
    - Select AT MOST 3 relevant projects and 3 relevant experiences based on the job description.
    - Each project or experience description is concise and NOT MORE THAN 2 sentences.
    - Sentences are achievement-oriented and quantify impact where possible.
    - The whole resume is between 350 and 450 words so it fits on a single page and stays ATS compatible.";
