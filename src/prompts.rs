//! Prompts sent to the report model.
//!
//! Every instruction the service gives the model lives here so that tests can
//! inspect the exact text without a running endpoint.

/// Prefix of the summary request; the report text follows it.
pub const SUMMARY_INSTRUCTION: &str = "Analyze the medical report and give a very short summarization of the patient details, overall assessment, keyfindings and suggested next steps or recommendations.Return the report summary as points and in markdown format and do not include any extra commentary or sentences.";

/// Role given to the model when explaining a single sentence.
pub const EXPLANATION_INSTRUCTION: &str = "You are a public-facing clinician. \
A learning user has provided a sentence from a medical report.\
Your task is to explain the meaning of ONLY the provided sentence in simple, clear terms. Explain terminology and abbriviations. Keep it concise. \
Directly address the meaning of the sentence. Do not use introductory phrases like 'Okay' or refer to the sentence itself or the report itself (e.g., 'This sentence means...'). \
Do not discuss any other part of the report or any sentences not explicitly provided by the user. Stick to facts in the text. Do not infer anything. \n\
===\n\
Keep the explanation to the point and concise.One or two sentences should be enough.";

pub const CHAT_INSTRUCTION: &str = "You are a medical chatbot and you are required to answer questions the patient might have about the report or any general questions related to the report.";

pub const IMAGE_REPORT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Asks for a report in the same `LABEL:` layout the markdown formatter understands.
pub const IMAGE_REPORT_PROMPT: &str = r#"Describe the image given in a detailed manner. Make predictions about the image based on your knowledge and provide a preliminary diagnosis.

Return answer in this format.
DESCRIPTION:
<Image Description>

DIAGNOSIS:
<Diagnosis>
"#;

pub fn summary_prompt(report_text: &str) -> String {
    format!("{}\nMedical Report: {}", SUMMARY_INSTRUCTION, report_text)
}

pub fn explanation_prompt(sentence: &str) -> String {
    format!(
        "Explain this sentence from the medical report: '{}'",
        sentence.to_lowercase()
    )
}

pub fn explanation_system_prompt(report_text: &str) -> String {
    format!(
        "{}For context, the full REPORT is:\n{}",
        EXPLANATION_INSTRUCTION, report_text
    )
}

/// System prompt for a chat turn. `history` is the caller's rendered
/// transcript and is omitted when empty.
pub fn chat_system_prompt(report_text: &str, history: &str) -> String {
    let mut prompt = format!("{} \n Report: {}", CHAT_INSTRUCTION, report_text);
    if !history.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(history);
    }
    prompt
}
