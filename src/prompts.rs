//! Prompts for LLM-based CV field extraction.
//!
//! Every prompt lives here so extraction rules can be changed in exactly one
//! place and inspected by unit tests without a live model.
//!
//! Callers can override the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

/// Default system prompt for CV extraction.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert recruitment researcher. You read the plain text of a CV or résumé and return the candidate's details as strict JSON.

Follow these rules precisely:

1. NAME
   - Return the candidate's full name as written on the CV

2. WORK EXPERIENCE
   - Return at most 5 roles, most recent first
   - Only operational employment: EXCLUDE board member, board director, advisory board,
     board of directors, non-executive director, supervisory board, board observer and
     board advisor positions
   - Every role needs both the company and the job title
   - Dates as "MM/YYYY - MM/YYYY", or "MM/YYYY - Present" for the current role

3. EDUCATION
   - Return every education entry
   - The degree is optional; omit it when the CV does not state one
   - Dates as "YYYY - YYYY"

4. OUTPUT FORMAT
   - Output ONLY the JSON object
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary or explanations"#;

/// JSON shape the model must fill in.
pub const RESPONSE_SCHEMA: &str = r#"{
  "name": "Full Name",
  "workHistory": [
    { "company": "Company", "jobTitle": "Job Title", "dates": "MM/YYYY - MM/YYYY" }
  ],
  "education": [
    { "institution": "University", "degree": "Degree (optional)", "dates": "YYYY - YYYY" }
  ]
}"#;

/// Build the user message for one candidate document.
pub fn extraction_prompt(cv_text: &str) -> String {
    format!(
        "Extract the candidate's details from the CV below.\n\n\
Respond with JSON in exactly this shape:\n{RESPONSE_SCHEMA}\n\n\
CV TEXT:\n\"\"\"\n{cv_text}\n\"\"\""
    )
}
