use poem_gen_core::corpus::document::CorpusBuilder;
use poem_gen_core::model::artifacts::Artifacts;
use poem_gen_core::model::generator::Generator;
use poem_gen_core::model::tokenizer::{Morpheme, Tokenizer, WordCategory, WordSubcategory};

use rand::SeedableRng;
use rand::rngs::StdRng;

/// A rule-based stand-in for a real morphological analyzer.
///
/// Splits text at a fixed set of particles, attaches terminal marks to
/// the preceding token and guesses categories from the last character.
/// Good enough to exercise the pipeline; a production build would plug
/// a dictionary-based tokenizer behind the same trait.
struct DemoTokenizer {
    particles: Vec<&'static str>,
}

impl DemoTokenizer {
    fn new() -> Self {
        Self { particles: vec!["が", "を", "に", "は", "の", "と", "で", "も", "へ"] }
    }

    fn classify(run: &str) -> WordCategory {
        if ["る", "く", "う", "む", "ぶ", "す", "つ"].iter().any(|e| run.ends_with(e)) {
            WordCategory::Verb
        } else if run.ends_with("い") {
            WordCategory::Adjective
        } else {
            WordCategory::Noun
        }
    }

    fn flush(run: &mut String, morphemes: &mut Vec<Morpheme>) {
        if !run.is_empty() {
            let category = Self::classify(run);
            morphemes.push(Morpheme::new(run.clone(), category, WordSubcategory::General));
            run.clear();
        }
    }
}

impl Tokenizer for DemoTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Morpheme> {
        let chars: Vec<char> = text.chars().collect();
        let mut morphemes = Vec::new();
        let mut run = String::new();
        let mut position = 0;

        while position < chars.len() {
            let c = chars[position];
            if c == '。' || c == '、' {
                Self::flush(&mut run, &mut morphemes);
                if let Some(last) = morphemes.last_mut() {
                    last.surface.push(c);
                }
                position += 1;
            } else if let Some(particle) =
                self.particles.iter().find(|p| p.chars().next() == Some(c))
            {
                Self::flush(&mut run, &mut morphemes);
                morphemes.push(Morpheme::new(
                    *particle,
                    WordCategory::Particle,
                    WordSubcategory::General,
                ));
                position += particle.chars().count();
            } else {
                run.push(c);
                position += 1;
            }
        }
        Self::flush(&mut run, &mut morphemes);

        morphemes
    }
}

/// Three inline corpus units: fenced header, then the body with its
/// keyword markers and cross-references.
const UNITS: [(&str, &str); 3] = [
    (
        "01-machine-song",
        "---\nid: 1\ntitle: \"機械の歌\"\ncluster: 1\nclusterName: 計算と詩\nlinksTo: [2]\n---\n\
         機械が静かな歌を歌う。【機械】の声が部屋に響く。\n歯車が回る、時間が回る。",
    ),
    (
        "02-poet-count",
        "---\nid: 2\ntitle: \"詩人の勘定\"\ncluster: 1\nclusterName: 計算と詩\nlinksTo: [1]\n---\n\
         詩人が言葉を数える。【言葉】は機械の夢を見る。\n§1の機械も夢を見る。",
    ),
    (
        "03-night-gears",
        "---\nid: 3\ntitle: \"夜の歯車\"\ncluster: 2\nclusterName: 夜想\nlinksTo: [1, 2]\n---\n\
         夜の機械が詩を書く。【詩】は歯車の歌になる。\n言葉が回る、歌が回る。",
    ),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Parse the corpus units; a duplicate id, a malformed header or a
    // link to a missing document would abort right here
    let mut builder = CorpusBuilder::new();
    for (unit, content) in UNITS {
        builder.add_unit(unit, content)?;
    }
    let documents = builder.finalize()?;
    println!("Parsed {} documents", documents.len());
    for document in &documents {
        println!("  §{} {} (linked from {:?})", document.id, document.title, document.linked_from);
    }

    // Compile the whole bundle in one pass
    let tokenizer = DemoTokenizer::new();
    let artifacts = Artifacts::build(documents, &tokenizer);
    println!(
        "Compiled {} keywords, {} chain units, {} starters, {} indexed words",
        artifacts.keywords.len(),
        artifacts.table.len(),
        artifacts.starters.len(),
        artifacts.index.len(),
    );

    // Persist the bundle the way the server will load it, then reload
    // to prove the round trip is lossless
    std::fs::create_dir_all("./data")?;
    artifacts.save("./data/corpus.bin")?;
    let artifacts = Artifacts::load("./data/corpus.bin")?;

    // A seeded rng makes the walk reproducible; swap in rand::rng()
    // for a different poem every run
    let mut rng = StdRng::seed_from_u64(9);
    let generator = Generator::new(&artifacts);

    let poem = generator.generate("機械", 3, 8, &mut rng);
    println!("\nPoem seeded by 機械:");
    for line in &poem {
        let text: Vec<&str> = line.tokens.iter().map(|t| t.text.as_str()).collect();
        println!("  {}", text.join(" "));
        for token in &line.tokens {
            println!(
                "    {} p={:.2} keyword={}",
                token.text, token.probability, token.is_keyword
            );
        }
    }

    // Alternatives of a line-initial position (the starter subset)
    println!("\nLine-initial alternatives:");
    for alternative in generator.alternatives(None).iter().take(5) {
        println!("  {} p={:.2}", alternative.text, alternative.probability);
    }

    // Alternatives after the first emitted unit, plus the documents the
    // unit's keyword points back to
    if let Some(first) = poem.first().and_then(|line| line.tokens.first()) {
        println!("\nAfter {}:", first.text);
        for alternative in generator.alternatives(Some(&first.text)) {
            println!("  {} p={:.2}", alternative.text, alternative.probability);
        }
        if let Some(word) = generator.keyword_of(&first.text) {
            println!("{} appears in documents {:?}", word, generator.documents_for(word));
        }
    }

    Ok(())
}
