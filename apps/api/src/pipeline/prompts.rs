// Prompt constants for every pipeline stage.
// Placeholders are `{state_key}` and are filled from session state by `stages::render_prompt`.

/// System prompt for the two parsers. Enforces JSON-only output.
pub const PARSER_SYSTEM: &str = "You are an expert resume and job description analyst. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const RESUME_PARSE_PROMPT: &str = r#"You are a resume parsing specialist. Extract the user's resume into a clean JSON structure without changing facts.

Return a JSON object with these fields:
- full_name
- contact_info: {email, phone, linkedin, github (if relevant), portfolio (if relevant)}
- education[]: {institution, degree, location: {city, state_or_country}, start_date (YYYY-MM), end_date (YYYY-MM), gpa (or percentage)}
- experience[]: {company, title, location, start_date, end_date, description}
- projects[]: {name, description, technologies[], link (if relevant), impact_bullets[]}
- skills: {hard_skills[], soft_skills[]} (group hard skills into categories when possible)
- certifications[]: {name, issuer, date}
- achievements[]: {title, description}
- languages[]: {language, proficiency}

RESUME:
{resume}"#;

pub const JD_PARSE_PROMPT: &str = r#"You are a job description analysis expert. Convert the given job description into a requirements map.

Return a JSON object with:
- role_title, seniority, location
- must_have_skills[]
- nice_to_have_skills[]
- responsibilities[]
- keywords[] (phrases important for ATS)
- screen_out_criteria[] (e.g. "requires 5+ years")

Do not copy long sentences; keep items short and specific.

JOB DESCRIPTION:
{job_description}"#;

pub const COMPANY_RESEARCH_PROMPT: &str = r#"You are a Company and Job Profile Analyst. Build a job profile for an applicant to the company below, using what you know about the company's mission, values, culture, recent news, products and core business.

Return a JSON object with this structure:
{
  "company_overview": {
    "mission": "...",
    "values": ["...", "..."],
    "culture_summary": "...",
    "recent_news_summary": "..."
  },
  "role_alignment": {
    "top_3_priorities": ["...", "...", "..."],
    "critical_skills": ["...", "..."],
    "ideal_candidate_profile": "..."
  }
}

The ideal_candidate_profile is a 2-3 sentence summary of the perfect candidate, blending skills with company culture. If you know little about the company, say so in culture_summary rather than guessing.

COMPANY NAME:
{company_name}"#;

pub const OPTIMIZER_SYSTEM: &str = "You are a concise resume optimizer. \
    You MUST respond with valid JSON only: the optimized resume object. \
    Do NOT use markdown code fences.";

/// Replace: {factual_instruction}, {content_rules}, {resume_structured}, {jd_structured}, {job_profile}
pub const OPTIMIZE_PROMPT: &str = r#"Generate an initial optimized resume draft that fits on a single page, highlighting alignment with the job description and company culture.

{factual_instruction}

Keep the JSON structure consistent with the parsed resume format.

{content_rules}

PARSED RESUME:
{resume_structured}

JOB REQUIREMENTS:
{jd_structured}

COMPANY INSIGHTS:
{job_profile}"#;

pub const CRITIQUE_SYSTEM: &str = "You are a constructive resume critique and ATS compatibility reviewer. \
    Output only the approval phrase or the suggested improvements as plain text.";

pub const CRITIQUE_PROMPT: &str = r#"Tasks:
1. Evaluate the resume for clarity, relevance, structure and ATS-friendliness.
2. Verify alignment with the job description and company profile.
3. If the resume is well-written and fully compatible, respond ONLY with the exact phrase: APPROVED
4. Otherwise, list concise, actionable information the candidate should provide (e.g. measurable results, missing required skills, unclear dates or roles).

RESUME:
{optimized_resume}

JOB DESCRIPTION:
{jd_structured}

COMPANY INSIGHTS:
{job_profile}"#;

/// Replace: {factual_instruction}, {content_rules}, {optimized_resume}, {critique}, {user_input}
pub const GAP_FILL_PROMPT: &str = r#"You are a resume refiner. You have a resume draft, a critique and the candidate's answer to that critique.

{factual_instruction}

- If the critique is EXACTLY "APPROVED", output the resume draft as-is.
- Otherwise rewrite the draft to incorporate the critique, using ONLY facts from the draft and the candidate's answer. If the candidate chose not to add information, improve what is already there without inventing details.

{content_rules}

RESUME DRAFT:
{optimized_resume}

CRITIQUE:
{critique}

CANDIDATE'S ANSWER:
{user_input}

Output the resume JSON."#;

pub const LATEX_SYSTEM: &str = "You are a specialist LaTeX resume generator. \
    Your only job is to populate a LaTeX template with the provided JSON data. \
    Output ONLY the filled LaTeX document, with no commentary and no code fences.";

pub const LATEX_PROMPT: &str = r#"Rules:
1. Do NOT edit, alter or remove any existing LaTeX syntax from the template. Only replace placeholder content.
2. To fit a single page you may remove irrelevant projects or experiences, but do NOT shorten the descriptions you keep.
3. Do not add extra curly braces. The template commands are correct.
4. Escape special characters (%, $, &, #, _) with a single backslash.
5. Do NOT use packages or commands not already present in the template.
6. Use only single backslashes in commands.
7. Re-check the output for LaTeX syntax errors.

Tasks:
1. Fill the template using the resume data.
2. For each experience and project, write one \resumeItem per impact bullet.
3. Populate every section (Education, Experience, Projects, Skills, Achievements, Languages) and remove any section with no data.
4. Put information that does not match a template section into the best fitting section.

RESUME DATA:
{optimized_resume}

LATEX TEMPLATE:
{latex_template}"#;
