//! BNB ecosystem fun facts.
//!
//! Topics come from a fixed catalog; the fact text comes from the capability.
//! There is no offline fact bank: without a capability the call fails.

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::error::{CapabilityError, FunFactError};
use crate::llm::{Conversation, GenerationRequest, ModelTier, Sampling, SharedCapability};
use crate::util::{fill_template, strip_markdown};

/// Category name and its subtopics.
pub const CATEGORIES: [(&str, [&str; 5]); 7] = [
  ("Technical", ["Consensus Mechanism", "Network Architecture", "Cross-Chain Technology", "Smart Contract Innovation", "Scalability Solutions"]),
  ("Economic", ["Tokenomics", "Gas Fee Mechanics", "Token Burns", "Market Dynamics", "Staking Economics"]),
  ("Ecosystem", ["DeFi Protocols", "GameFi Projects", "NFT Marketplaces", "DEX Platforms", "Yield Farming"]),
  ("Development", ["Developer Tools", "Security Features", "Testing Frameworks", "Documentation", "Community Resources"]),
  ("Governance", ["BNB Proposals", "Voting Mechanisms", "Community Decisions", "Protocol Upgrades", "Validator Operations"]),
  ("Innovation", ["Layer 2 Solutions", "ZK Technology", "Oracle Integration", "AI Integration", "Green Initiatives"]),
  ("Partnerships", ["Enterprise Collaborations", "Academic Research", "Industry Alliances", "Cross-Chain Bridges", "Integration Projects"]),
];

pub const SPECIAL_TOPICS: [&str; 10] = [
  "Historical Milestones",
  "Future Roadmap",
  "Community Success Stories",
  "Educational Initiatives",
  "Hackathon Achievements",
  "Sustainability Efforts",
  "User Adoption Metrics",
  "Regional Developments",
  "Competition Analysis",
  "Research Breakthroughs",
];

const SPECIAL_TOPIC_PROBABILITY: f64 = 0.3;

/// Either a special topic or `"Category: Subtopic"`.
pub fn random_topic<R: Rng>(rng: &mut R) -> String {
  if rng.gen_bool(SPECIAL_TOPIC_PROBABILITY) {
    if let Some(t) = SPECIAL_TOPICS.choose(rng) {
      return (*t).to_string();
    }
  }
  match CATEGORIES.choose(rng) {
    Some((category, subs)) => {
      let sub = subs.choose(rng).copied().unwrap_or(subs[0]);
      format!("{}: {}", category, sub)
    }
    None => SPECIAL_TOPICS[0].to_string(),
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunFact {
  pub topic: String,
  pub facts: String,
}

pub struct FunFactGenerator {
  capability: SharedCapability,
  system: String,
  user_template: String,
  sampling: Sampling,
  // Shared by every caller so the model sees which facts it already gave.
  conversation: Mutex<Conversation>,
}

impl FunFactGenerator {
  pub fn new(capability: SharedCapability, prompts: &Prompts, sampling: Sampling) -> Self {
    Self {
      capability,
      system: prompts.fun_facts_system.clone(),
      user_template: prompts.fun_facts_user_template.clone(),
      sampling,
      conversation: Mutex::new(Conversation::default()),
    }
  }

  pub fn is_available(&self) -> bool {
    self.capability.is_some()
  }

  /// One fact about `topic` (a random catalog topic when absent or blank).
  #[instrument(level = "info", skip(self))]
  pub async fn generate(&self, topic: Option<&str>) -> Result<FunFact, FunFactError> {
    let topic = match topic.map(str::trim).filter(|t| !t.is_empty()) {
      Some(t) => t.to_string(),
      None => random_topic(&mut rand::thread_rng()),
    };
    let Some(capability) = &self.capability else {
      error!(target: "questbot_backend", %topic, "Fun facts requested without a capability");
      return Err(CapabilityError::Unavailable.into());
    };

    let prompt = fill_template(&self.user_template, &[("topic", &topic)]);
    let request =
      GenerationRequest::in_conversation(&self.system, &*self.conversation.lock().await, &prompt, self.sampling, ModelTier::Strong);
    let raw = capability.generate(request).await.map_err(|e| {
      error!(target: "questbot_backend", %topic, error = %e, "Fun fact generation failed");
      FunFactError::from(e)
    })?;
    self.conversation.lock().await.push_exchange(&prompt, &raw);

    info!(target: "questbot_backend", %topic, len = raw.len(), "Fun fact generated");
    Ok(FunFact { topic, facts: strip_markdown(&raw) })
  }
}

#[cfg(test)]
mod tests {
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  use super::*;
  use crate::llm::testing::{shared, ScriptedCapability};

  #[test]
  fn random_topics_come_from_the_catalog() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut saw_special = false;
    let mut saw_category = false;
    for _ in 0..200 {
      let topic = random_topic(&mut rng);
      if SPECIAL_TOPICS.contains(&topic.as_str()) {
        saw_special = true;
        continue;
      }
      let (category, sub) = topic.split_once(": ").unwrap();
      let (_, subs) = CATEGORIES.iter().find(|(c, _)| *c == category).unwrap();
      assert!(subs.contains(&sub));
      saw_category = true;
    }
    assert!(saw_special && saw_category);
  }

  #[tokio::test]
  async fn generates_for_given_topic_and_strips_markdown() {
    let cap = ScriptedCapability::replying(&["1. **BNB** burns happen `quarterly`.", "2. Another"]);
    let g = FunFactGenerator::new(shared(&cap), &Prompts::default(), Sampling::creative());

    let fact = g.generate(Some("Token Burns")).await.unwrap();
    assert_eq!(fact.topic, "Token Burns");
    assert_eq!(fact.facts, "1. BNB burns happen quarterly.");
    assert!(cap.last_prompt().unwrap().contains("about Token Burns in the BNB"));

    g.generate(Some("  ")).await.unwrap();
    assert_eq!(cap.seen.lock().unwrap()[1].turns.len(), 3);
  }

  #[tokio::test]
  async fn concurrent_facts_are_generated_in_parallel() {
    let cap = ScriptedCapability::gated(&["Fact one.", "Fact two."], 2);
    let g = FunFactGenerator::new(shared(&cap), &Prompts::default(), Sampling::creative());
    let (a, b) = tokio::time::timeout(std::time::Duration::from_secs(5), async {
      tokio::join!(g.generate(Some("Gas")), g.generate(Some("Staking")))
    })
    .await
    .expect("both requests reach the capability together");
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(g.conversation.lock().await.turns().len(), 4);
  }

  #[tokio::test]
  async fn missing_or_failing_capability_is_an_error() {
    let g = FunFactGenerator::new(None, &Prompts::default(), Sampling::creative());
    assert!(matches!(g.generate(None).await, Err(FunFactError::Capability(CapabilityError::Unavailable))));

    let g = FunFactGenerator::new(shared(&ScriptedCapability::failing()), &Prompts::default(), Sampling::creative());
    assert!(g.generate(Some("DEX Platforms")).await.is_err());
  }
}
