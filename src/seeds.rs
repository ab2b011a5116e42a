//! Built-in question bank so the service and tests are useful without
//! external config: a deterministic, Prelims-shaped pool of 220 drafts.
//!
//! Subjects come in fixed blocks, difficulty cycles with period 11
//! (2 easy, 6 medium, 3 hard) and formats with period 10, so every subject
//! sees every format at every level. Trap items are trap-prone formats that
//! carry a "None of the above" option, in four of every forty items.

use std::collections::BTreeSet;

use crate::assess::prepare_pool;
use crate::config::EngineSettings;
use crate::domain::{CandidateItem, DifficultyLabel, ItemContent, ItemDraft, ItemFormat, Subject};
use crate::error::ComposeResult;

struct Topic {
  name: &'static str,
  tags: [&'static str; 4],
  facts: [&'static str; 2],
}

macro_rules! topic {
  ($name:expr, [$($tag:expr),+], $f1:expr, $f2:expr) => {
    Topic { name: $name, tags: [$($tag),+], facts: [$f1, $f2] }
  };
}

const POLITY: [Topic; 5] = [
  topic!("fundamental rights", ["polity:fundamental-rights", "polity:article-32", "polity:writs", "polity:judicial-review"],
    "Article 32 allows a citizen to move the Supreme Court for enforcement of fundamental rights.",
    "The Supreme Court can issue writs such as habeas corpus and mandamus."),
  topic!("parliament", ["polity:parliament", "polity:rajya-sabha", "polity:money-bill", "polity:legislative-procedure"],
    "One third of the members of the Rajya Sabha retire every second year.",
    "A money bill can be introduced only in the Lok Sabha."),
  topic!("federalism", ["polity:federalism", "polity:finance-commission", "polity:seventh-schedule", "economy:fiscal-transfers"],
    "Article 280 provides for a Finance Commission.",
    "The Seventh Schedule divides subjects into Union, State and Concurrent lists."),
  topic!("local government", ["polity:local-government", "polity:panchayati-raj", "polity:73rd-amendment", "polity:urban-bodies"],
    "The 73rd Amendment gave constitutional status to panchayats.",
    "The 74th Amendment deals with urban local bodies."),
  topic!("union executive", ["polity:union-executive", "polity:council-of-ministers", "polity:president", "polity:collective-responsibility"],
    "The Prime Minister heads the Council of Ministers.",
    "The President acts on the advice of the Council of Ministers."),
];

const HISTORY: [Topic; 5] = [
  topic!("revolt of 1857", ["history:revolt-1857", "history:meerut", "history:mughal-succession", "history:company-rule"],
    "The revolt of 1857 began at Meerut.",
    "Bahadur Shah Zafar was proclaimed emperor by the rebels."),
  topic!("national movement", ["history:national-movement", "history:non-cooperation", "history:quit-india", "history:gandhian-methods"],
    "The Non-Cooperation Movement was launched in 1920.",
    "The Quit India Movement was launched in 1942."),
  topic!("harappan civilisation", ["history:harappan", "history:lothal", "history:urban-planning", "geography:river-valleys"],
    "Lothal had a dockyard.",
    "The Great Bath was found at Mohenjo-daro."),
  topic!("mughal administration", ["history:mughal-administration", "history:mansabdari", "history:land-revenue", "economy:agrarian-taxation"],
    "Akbar introduced the mansabdari system.",
    "Todar Mal reformed land revenue under Akbar."),
  topic!("bhakti movement", ["history:bhakti", "history:kabir", "history:guru-nanak", "history:vernacular-literature"],
    "Kabir composed dohas in a vernacular idiom.",
    "Guru Nanak preached the unity of God."),
];

const GEOGRAPHY: [Topic; 5] = [
  topic!("monsoon", ["geography:monsoon", "geography:orographic-rainfall", "geography:western-ghats", "environment:climate-variability"],
    "The southwest monsoon brings most of the annual rainfall to India.",
    "The Western Ghats receive heavy orographic rainfall."),
  topic!("peninsular rivers", ["geography:rivers", "geography:godavari", "geography:rift-valley", "geography:drainage"],
    "The Godavari is the longest peninsular river.",
    "The Narmada flows westward through a rift valley."),
  topic!("soils", ["geography:soils", "geography:black-soil", "geography:laterite", "economy:cropping-pattern"],
    "Black soil is suited to cotton cultivation.",
    "Laterite soil forms under heavy rainfall and leaching."),
  topic!("ocean currents", ["geography:ocean-currents", "geography:humboldt-current", "geography:coastal-climate", "environment:upwelling"],
    "The Humboldt Current flows along the western coast of South America.",
    "Warm currents raise coastal temperatures."),
  topic!("plate tectonics", ["geography:plate-tectonics", "geography:himalayas", "geography:fold-mountains", "geography:convergent-boundaries"],
    "The Himalayas formed through the collision of the Indian and Eurasian plates.",
    "Fold mountains form along convergent boundaries."),
];

const ECONOMY: [Topic; 5] = [
  topic!("monetary policy", ["economy:monetary-policy", "economy:repo-rate", "economy:inflation-targeting", "economy:mpc"],
    "The Monetary Policy Committee fixes the policy repo rate.",
    "The inflation target is set by the central government in consultation with the RBI."),
  topic!("union budget", ["economy:budget", "economy:fiscal-deficit", "polity:article-112", "economy:finance-ministry"],
    "The Union Budget is presented under Article 112.",
    "The Finance Ministry frames fiscal policy."),
  topic!("banking", ["economy:banking", "economy:scheduled-banks", "economy:priority-sector", "economy:credit"],
    "Scheduled banks are listed in the Second Schedule of the RBI Act.",
    "Priority sector lending covers agriculture and small enterprises."),
  topic!("external sector", ["economy:external-sector", "economy:current-account", "economy:forex-reserves", "economy:trade"],
    "The current account records trade in goods and services.",
    "Foreign exchange reserves are managed by the RBI."),
  topic!("inflation", ["economy:inflation", "economy:cpi", "economy:wpi", "economy:price-indices"],
    "The Consumer Price Index measures retail inflation.",
    "The Wholesale Price Index covers goods at the wholesale stage."),
];

const ENVIRONMENT: [Topic; 5] = [
  topic!("biodiversity", ["environment:biodiversity", "environment:hotspots", "environment:endemism", "geography:western-ghats"],
    "The Western Ghats are a biodiversity hotspot.",
    "Endemic species occur naturally in only one region."),
  topic!("climate change", ["environment:climate-change", "environment:paris-agreement", "environment:greenhouse-gases", "current_affairs:cop"],
    "The Paris Agreement aims to limit warming well below two degrees.",
    "Methane is a potent greenhouse gas."),
  topic!("protected areas", ["environment:protected-areas", "environment:biosphere-reserves", "environment:national-parks", "polity:wildlife-law"],
    "Biosphere reserves include core, buffer and transition zones.",
    "National parks are notified under the Wildlife Protection Act."),
  topic!("wetlands", ["environment:wetlands", "environment:ramsar", "environment:chilika", "geography:lagoons"],
    "The Ramsar Convention protects wetlands of international importance.",
    "Chilika Lake is a Ramsar site."),
  topic!("air pollution", ["environment:pollution", "environment:ozone", "environment:fly-ash", "science:combustion"],
    "Ground level ozone is a secondary pollutant.",
    "Fly ash is a residue of coal combustion."),
];

const SCIENCE: [Topic; 5] = [
  topic!("space technology", ["science:space", "science:chandrayaan", "science:geostationary-orbit", "science:launch-vehicles"],
    "Chandrayaan-3 landed near the lunar south pole.",
    "Geostationary satellites orbit above the equator."),
  topic!("biotechnology", ["science:biotechnology", "science:crispr", "science:bt-cotton", "economy:agriculture"],
    "CRISPR enables targeted editing of genes.",
    "Bt cotton carries a gene from a soil bacterium."),
  topic!("nuclear energy", ["science:nuclear-energy", "science:heavy-water", "science:three-stage-programme", "science:reactors"],
    "Heavy water acts as a moderator in some reactors.",
    "India follows a three stage nuclear programme."),
  topic!("public health", ["science:health", "science:vaccines", "science:antibiotics", "science:immunity"],
    "Vaccines train the immune system to recognise pathogens.",
    "Antibiotics act against bacterial infections."),
  topic!("digital technology", ["science:digital", "science:blockchain", "science:quantum-computing", "science:cryptography"],
    "Blockchain keeps a distributed ledger of transactions.",
    "Quantum computers use qubits."),
];

const CURRENT_AFFAIRS: [Topic; 5] = [
  topic!("international organisations", ["current_affairs:g20", "current_affairs:wto", "current_affairs:multilateralism", "economy:trade"],
    "India held the G20 presidency in 2023.",
    "The WTO settles trade disputes between members."),
  topic!("government schemes", ["current_affairs:schemes", "current_affairs:pm-kisan", "current_affairs:jal-jeevan", "economy:welfare"],
    "PM-KISAN provides income support to farmers.",
    "Jal Jeevan Mission aims at tap water for rural households."),
  topic!("summits", ["current_affairs:summits", "current_affairs:cop28", "current_affairs:brics", "environment:climate-change"],
    "COP28 was held in Dubai.",
    "The BRICS grouping admitted new members in 2024."),
  topic!("awards", ["current_affairs:awards", "current_affairs:bharat-ratna", "current_affairs:phalke-award", "history:cinema"],
    "The Bharat Ratna is the highest civilian award of India.",
    "The Dadasaheb Phalke Award honours contributions to cinema."),
  topic!("reports and indices", ["current_affairs:indices", "current_affairs:hdr", "current_affairs:hunger-index", "economy:development"],
    "The Human Development Report is published by UNDP.",
    "The Global Hunger Index ranks countries on hunger indicators."),
];

/// Block sizes per subject; they add up to 220.
const BLOCKS: [(Subject, usize); 7] = [
  (Subject::Polity, 40),
  (Subject::History, 35),
  (Subject::Geography, 30),
  (Subject::Economy, 35),
  (Subject::Environment, 25),
  (Subject::Science, 20),
  (Subject::CurrentAffairs, 35),
];

const LEVELS: [DifficultyLabel; 11] = {
  use DifficultyLabel::{Easy as E, Hard as H, Medium as M};
  [M, E, M, H, M, M, H, E, M, H, M]
};

const CODE_OPTIONS: [&str; 4] = ["1 only", "2 only", "Both 1 and 2", "Neither 1 nor 2"];
const ASSERTION_OPTIONS: [&str; 4] = [
  "Both A and R are true and R is the correct explanation of A",
  "Both A and R are true but R is not the correct explanation of A",
  "A is true but R is false",
  "A is false but R is true",
];
const TRAP_OPTION: &str = "None of the above";

fn topics(subject: Subject) -> &'static [Topic; 5] {
  match subject {
    Subject::Polity => &POLITY,
    Subject::History => &HISTORY,
    Subject::Geography => &GEOGRAPHY,
    Subject::Economy => &ECONOMY,
    Subject::Environment => &ENVIRONMENT,
    Subject::Science => &SCIENCE,
    Subject::CurrentAffairs => &CURRENT_AFFAIRS,
  }
}

fn content(subject: Subject, t: usize, format: ItemFormat, trap: bool, solve_secs: u32) -> ItemContent {
  let all = topics(subject);
  let topic = &all[t];
  let [f1, f2] = topic.facts;
  let numbered = vec![format!("1. {f1}"), format!("2. {f2}")];
  let explanation = format!("{f1} {f2}");

  // Four true facts from the subject; the keyed one belongs to the topic asked about.
  let fact_options = |keyed_slot: usize| -> (Vec<String>, usize) {
    let mut opts: Vec<String> = (1..all.len()).map(|k| all[(t + k) % all.len()].facts[0].to_string()).take(3).collect();
    opts.insert(keyed_slot, f1.to_string());
    (opts, keyed_slot)
  };

  let (stem, statements, mut options, key) = match format {
    ItemFormat::StatementBased => (
      format!("Consider the following statements about {}. Which of the statements given above are correct?", topic.name),
      numbered,
      CODE_OPTIONS.map(String::from).to_vec(),
      2,
    ),
    ItemFormat::MultipleCorrect => (
      format!("With reference to {}, select the correct statements from the list below:", topic.name),
      numbered,
      CODE_OPTIONS.map(String::from).to_vec(),
      2,
    ),
    ItemFormat::AssertionReason => (
      format!("Read the assertion and reason on {} and choose the correct code:", topic.name),
      vec![format!("Assertion (A): {f1}"), format!("Reason (R): {f2}")],
      ASSERTION_OPTIONS.map(String::from).to_vec(),
      1,
    ),
    ItemFormat::MatchPairs => (
      format!("Which of the pairs on {} given below are correctly matched?", topic.name),
      vec![format!("Pair 1: {f1}"), format!("Pair 2: {f2}")],
      CODE_OPTIONS.map(String::from).to_vec(),
      2,
    ),
    ItemFormat::Sequence => (
      format!("Arrange the following points on {} in the order given in the standard syllabus:", topic.name),
      numbered,
      vec!["1 then 2".into(), "2 then 1".into(), "Both at the same stage".into(), "Neither belongs to the syllabus".into()],
      0,
    ),
    ItemFormat::OddOneOut => {
      let (opts, _) = fact_options(t % 4);
      let key = (t + 1) % 4;
      (format!("Which one of the following statements is unrelated to {}?", topic.name), vec![], opts, key)
    }
    ItemFormat::SingleCorrect => {
      let (opts, key) = fact_options(t % 4);
      (format!("Which one of the following statements about {} is correct?", topic.name), vec![], opts, key)
    }
    ItemFormat::CaseStudy => {
      let (opts, key) = fact_options((t + 2) % 4);
      (format!("Read the case on {} set out in the passage and identify the correct inference:", topic.name), vec![], opts, key)
    }
    ItemFormat::MapBased => {
      let (opts, key) = fact_options((t + 1) % 4);
      (format!("On the basis of the outline map supplied, identify the correct statement on {}:", topic.name), vec![], opts, key)
    }
    ItemFormat::DataBased => {
      let (opts, key) = fact_options((t + 3) % 4);
      (format!("Based on the data table supplied, identify the correct statement on {}:", topic.name), vec![], opts, key)
    }
  };
  if trap {
    let slot = if key == 3 { 2 } else { 3 };
    options[slot] = TRAP_OPTION.to_string();
  }

  ItemContent { stem, statements, options, correct_options: vec![key], explanation, expected_solve_secs: Some(solve_secs) }
}

/// The 220 built-in drafts, in a fixed order.
pub fn seed_drafts() -> Vec<ItemDraft> {
  let mut out = Vec::with_capacity(220);
  let mut i = 0usize;
  for (subject, size) in BLOCKS {
    for j in 0..size {
      let label = LEVELS[i % LEVELS.len()];
      let format = ItemFormat::ALL[i % ItemFormat::ALL.len()];
      let trap = format.is_trap_prone() && (i / 10) % 4 == 0;
      let t = j % 5;
      let (score, tag_count, secs) = match label {
        DifficultyLabel::Easy => (20 + (i * 7) % 15, 1 + i % 2, 45),
        DifficultyLabel::Medium => (40 + (i * 11) % 26, 2 + i % 2, 90),
        DifficultyLabel::Hard => (72 + (i * 5) % 19, 3 + i % 2, 160),
      };
      let concept_tags: BTreeSet<String> = topics(subject)[t].tags.iter().take(tag_count).map(|s| s.to_string()).collect();
      out.push(ItemDraft {
        id: format!("{}-{:03}", subject.as_str().replace('_', "-"), j + 1),
        subject,
        topic: topics(subject)[t].name.to_string(),
        format,
        concept_tags,
        raw_difficulty_score: Some(score as f64),
        is_trap: None,
        content: Some(content(subject, t, format, trap, secs)),
        source_facts: vec![],
      });
      i += 1;
    }
  }
  out
}

/// Seed drafts assessed with `settings`.
pub fn seed_pool(settings: &EngineSettings) -> ComposeResult<Vec<CandidateItem>> {
  prepare_pool(&seed_drafts(), settings)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assess::Assessor;
  use std::collections::{BTreeMap, HashSet};

  #[test]
  fn pool_has_the_documented_shape() {
    let drafts = seed_drafts();
    assert_eq!(drafts.len(), 220);
    let ids: HashSet<&str> = drafts.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids.len(), 220);

    let pool = seed_pool(&EngineSettings::default()).expect("pool");
    let mut labels: BTreeMap<DifficultyLabel, usize> = BTreeMap::new();
    for item in &pool {
      *labels.entry(item.difficulty_label).or_default() += 1;
    }
    assert_eq!(labels[&DifficultyLabel::Easy], 40);
    assert_eq!(labels[&DifficultyLabel::Medium], 120);
    assert_eq!(labels[&DifficultyLabel::Hard], 60);
    assert_eq!(pool.iter().filter(|i| i.is_trap).count(), 24);
    assert_eq!(pool.iter().filter(|i| i.subject == Subject::CurrentAffairs).count(), 35);
  }

  #[test]
  fn every_seed_item_passes_the_gate() {
    let assessor = Assessor::new(&EngineSettings::default()).expect("assessor");
    for draft in seed_drafts() {
      let a = assessor.prepare_item(&draft);
      assert!(a.verdict.passed, "{} failed: {:?}", draft.id, a.verdict.findings);
      assert!(a.item.label_is_consistent());
    }
  }

  #[test]
  fn trap_items_are_trap_prone_formats() {
    for item in seed_pool(&EngineSettings::default()).expect("pool") {
      if item.is_trap {
        assert!(item.format.is_trap_prone(), "{}", item.id);
      }
    }
  }
}
