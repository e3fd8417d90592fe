//! Process configuration: environment variables plus an optional TOML file
//! (prompts + sampling overrides).
//!
//! See `AgentConfig`, `Prompts` and `SamplingProfiles` for the TOML schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::llm::Sampling;

pub const DEFAULT_SESSION_IDLE_MINUTES: i64 = 60;

/// Everything resolved at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  /// Game sessions untouched for this many minutes are evicted.
  pub session_idle_minutes: i64,
  pub llm: LlmSettings,
  pub prompts: Prompts,
  pub sampling: SamplingProfiles,
}

/// Connection settings for the OpenAI-compatible backend.
#[derive(Clone, Debug)]
pub struct LlmSettings {
  pub api_key: Option<String>,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  pub timeout_secs: u64,
  pub send_top_k: bool,
}

impl Default for LlmSettings {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: "https://api.openai.com/v1".into(),
      fast_model: "gpt-4o-mini".into(),
      strong_model: "gpt-4o".into(),
      timeout_secs: 20,
      send_top_k: false,
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub sampling: SamplingProfiles,
}

/// Sampling per use case: creative generation runs hot, judging runs cold.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SamplingProfiles {
  pub challenge: Sampling,
  pub fun_facts: Sampling,
  pub writing_prompt: Sampling,
  pub evaluation: Sampling,
}

impl Default for SamplingProfiles {
  fn default() -> Self {
    Self {
      challenge: Sampling::creative(),
      fun_facts: Sampling { temperature: 0.8, top_p: 0.9, top_k: Some(40) },
      writing_prompt: Sampling { temperature: 0.8, top_p: 0.8, top_k: Some(40) },
      evaluation: Sampling::evaluation(),
    }
  }
}

/// Prompts used against the text-generation capability. `{placeholders}` are
/// filled with `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Quiz
  pub quiz_system: String,
  pub quiz_user_template: String,
  // Riddle
  pub riddle_system: String,
  pub riddle_user_template: String,
  // Answer verification
  pub verification_system: String,
  pub verification_user_template: String,
  // Break suggestions
  pub break_user_template: String,
  // Fun facts
  pub fun_facts_system: String,
  pub fun_facts_user_template: String,
  // Creative writing
  pub writing_prompt_user: String,
  pub writing_eval_system: String,
  pub writing_eval_user_template: String,
  pub writing_scores_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You are a quiz master for a blockchain and Web3 learning platform focused on the BNB Chain ecosystem. Never repeat a question you already asked in this conversation.".into(),
      quiz_user_template: "Generate a multiple choice question about the BNB Blockchain.\nComplexity Level: {complexity}\n\nFormat your response EXACTLY like this:\nQuestion (Complexity Level {complexity}): [Your question]\nOptions:\nA) [Option 1]\nB) [Option 2]\nC) [Option 3]\nD) [Option 4]\nHint: [Your hint]\nANSWER: [Correct option letter]".into(),
      riddle_system: "You write riddles about the BNB Chain ecosystem and the wider Web3 space. Never repeat a riddle you already told in this conversation.".into(),
      riddle_user_template: "Generate a riddle about the BNB Blockchain Ecosystem within the Web3 space.\nThe riddle should match the specified complexity level: {complexity}.\n\nImportant: Your response MUST include:\n1. A riddle about blockchain/Web3\n2. A hint to help solve the riddle\n3. The correct answer\n\nPlease format your response with only these clear sections:\nRIDDLE: [Your riddle text]\nHINT: [A helpful hint]\nANSWER: [The correct answer]\n\nComplexity Level: {complexity}".into(),
      verification_system: "You are an expert at verifying if two answers are equivalent.\nYour task is to:\n1. Carefully compare two given answers\n2. Determine if they represent the same concept or solution\n3. Respond with ONLY 'EQUIVALENT' or 'DIFFERENT'\n4. Be strict but fair in your comparison\n5. Ignore minor differences like capitalization, spacing, or punctuation".into(),
      verification_user_template: "Correct Answer: {correct}\nUser Answer: {user}\n\nAre these answers equivalent?".into(),
      break_user_template: "User wants to take a break from the blockchain {game} game.\nGenerate a friendly response suggesting alternative activities on the learning platform, as a short numbered list.".into(),
      fun_facts_system: "Generate engaging, accurate facts about the BNB blockchain ecosystem.".into(),
      fun_facts_user_template: "Generate 1 fascinating and detailed fun fact about {topic} in the BNB blockchain ecosystem.\nInclude specific numbers, dates, statistics, or technical details when relevant.\nFormat as a numbered list with each fact being 2-3 sentences.\nFocus on unique, lesser-known, but accurate information.\nIf possible, include comparisons with other blockchain ecosystems or real-world analogies.".into(),
      writing_prompt_user: "Generate two sections:\n\nSECTION 1 - CREATIVE PROMPT:\nCreate an engaging Web3/Blockchain/Tech-focused writing prompt that includes:\n- A warm welcome with emojis\n- An imaginative scenario or challenge\n- Clear writing rules (word count, style)\n- An encouraging closing question\n\nSECTION 2 - EVALUATION CRITERIA:\nList specific criteria for evaluating submissions in detail including:\n- Technical understanding\n- Creativity and innovation\n- Writing clarity and structure\n- Engagement and impact\n- Adherence to prompt requirements\n\nFormat with clear SECTION 1 and SECTION 2 headers. Output only the two sections, no preamble.".into(),
      writing_eval_system: "You are a fair and encouraging evaluator of creative writing about blockchain technology.".into(),
      writing_eval_user_template: "You are evaluating a creative writing submission based on the following:\n\nORIGINAL PROMPT:\n{prompt}\n\nEVALUATION CRITERIA:\n{criteria}\n\nSUBMISSION:\n{submission}\n\nProvide a detailed evaluation that includes:\n1. Numerical scores (1-5) for each criterion\n2. Specific feedback for each score\n3. Notable highlights from the submission\n4. Constructive suggestions for improvement".into(),
      writing_scores_user_template: "Convert this evaluation feedback into a JSON object with these fields:\n- technical_understanding: {\"score\": number, \"feedback\": string}\n- creativity: {\"score\": number, \"feedback\": string}\n- clarity: {\"score\": number, \"feedback\": string}\n- engagement: {\"score\": number, \"feedback\": string}\n- adherence: {\"score\": number, \"feedback\": string}\n- overall_score: average of all scores\nFeedback to convert:\n{feedback}".into(),
    }
  }
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 8000,
      session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
      llm: LlmSettings::default(),
      prompts: Prompts::default(),
      sampling: SamplingProfiles::default(),
    }
  }
}

impl AppConfig {
  /// Resolve configuration from the environment (and AGENT_CONFIG_PATH if set).
  pub fn from_env() -> Self {
    let agent = load_agent_config_from_env().unwrap_or_default();
    let defaults = LlmSettings::default();
    let llm = LlmSettings {
      api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
      base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
      fast_model: std::env::var("OPENAI_FAST_MODEL").unwrap_or(defaults.fast_model),
      strong_model: std::env::var("OPENAI_STRONG_MODEL").unwrap_or(defaults.strong_model),
      timeout_secs: env_parse("LLM_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
      send_top_k: env_parse("OPENAI_SEND_TOP_K").unwrap_or(defaults.send_top_k),
    };

    Self {
      port: env_parse("PORT").unwrap_or(8000),
      session_idle_minutes: env_parse::<i64>("SESSION_IDLE_MINUTES")
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_SESSION_IDLE_MINUTES),
      llm,
      prompts: agent.prompts,
      sampling: agent.sampling,
    }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "questbot_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "questbot_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "questbot_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}
