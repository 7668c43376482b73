//! Per-dataset metadata for natural language search.
//!
//! Datasets have to be indexed explicitly before they can be searched. Entries are
//! keyed by dataset name and live until they are re-indexed or removed.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::llm::{GenerativeModel, SearchError};
use crate::models::{DatasetStats, RelevantClass, SearchResponse, SearchStats};

/// example filenames kept per class
pub const SAMPLE_FILES_PER_CLASS: usize = 5;
/// classes listed individually in the prompt
pub const PROMPT_TOP_CLASSES: usize = 20;
/// cap for relevant classes and suggestions
pub const MAX_MATCHES: usize = 10;

/// category words a query may use, and class-name fragments that belong to them
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "animal",
        &[
            "leopard", "ant", "elephant", "crocodile", "dolphin", "flamingo", "kangaroo",
            "lobster", "octopus", "sea_horse", "starfish", "stegosaurus", "trilobite",
        ],
    ),
    ("vehicle", &["car", "airplane", "motorbike", "ferry", "helicopter"]),
    ("face", &["face", "person"]),
    (
        "object",
        &[
            "accordion", "anchor", "barrel", "bass", "bell", "bonsai", "bottle", "brain",
            "buddha", "calculator", "camera", "cannon", "chair", "chandelier", "clock", "cup",
            "dalmatian", "dragonfly", "electric_guitar", "garfield", "gramophone", "guitar",
            "hammer", "hawksbill", "headphone", "inline_skate", "joshua_tree", "ketch", "lamp",
            "laptop", "llama", "mandolin", "mayfly", "metronome", "minaret", "nautilus",
            "pagoda", "panda", "piano", "pigeon", "pizza", "platypus", "pyramid", "revolver",
            "rhino", "rooster", "saxophone", "schooner", "scissors", "scorpion", "soccer_ball",
            "stapler", "stop_sign", "strawberry", "sunflower", "table", "tick", "umbrella",
            "watch", "water_lilly", "wheelchair", "wild_cat", "windsor_chair", "wrench",
            "yin_yang",
        ],
    ),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassDetail {
    pub count: usize,
    /// share of `total_images`, 0 when there are no images
    pub percentage: f64,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassSummary {
    pub max_images_per_class: usize,
    pub min_images_per_class: usize,
    pub avg_images_per_class: f64,
    pub largest_class: String,
    pub smallest_class: String,
}

/// everything the prompt and keyword matching need for one dataset
#[derive(Debug, Clone, Serialize)]
pub struct DatasetIndex {
    pub dataset_name: String,
    pub total_classes: usize,
    pub total_images: usize,
    pub total_files: usize,
    pub file_types: BTreeMap<String, usize>,
    /// in stats order
    pub classes: Vec<String>,
    pub class_details: HashMap<String, ClassDetail>,
    pub classes_by_count: Vec<String>,
    pub summary: Option<ClassSummary>,
    pub indexed_at: DateTime<Utc>,
}

impl DatasetIndex {
    pub fn build(dataset_name: &str, stats: &DatasetStats) -> Self {
        let mut classes = Vec::with_capacity(stats.classes.len());
        let mut class_details = HashMap::with_capacity(stats.classes.len());

        for class in &stats.classes {
            let percentage = if stats.total_images > 0 {
                class.count as f64 / stats.total_images as f64 * 100.0
            } else {
                0.0
            };
            classes.push(class.name.clone());
            class_details.insert(
                class.name.clone(),
                ClassDetail {
                    count: class.count,
                    percentage,
                    files: class.files.iter().take(SAMPLE_FILES_PER_CLASS).cloned().collect(),
                },
            );
        }

        let count_of = |name: &String| class_details.get(name).map_or(0, |d: &ClassDetail| d.count);

        let mut classes_by_count = classes.clone();
        classes_by_count.sort_by(|a, b| count_of(b).cmp(&count_of(a)));

        let summary = classes_by_count.first().map(|largest| {
            let counts: Vec<usize> = classes.iter().map(count_of).collect();
            let min = counts.iter().copied().min().unwrap_or(0);
            // first class holding the minimum, in stats order
            let smallest = classes
                .iter()
                .find(|c| count_of(*c) == min)
                .cloned()
                .unwrap_or_default();
            ClassSummary {
                max_images_per_class: counts.iter().copied().max().unwrap_or(0),
                min_images_per_class: min,
                avg_images_per_class: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
                largest_class: largest.clone(),
                smallest_class: smallest,
            }
        });

        Self {
            dataset_name: dataset_name.to_string(),
            total_classes: stats.total_folders,
            total_images: stats.total_images,
            total_files: stats.total_files,
            file_types: stats.file_types.clone(),
            classes,
            class_details,
            classes_by_count,
            summary,
            indexed_at: Utc::now(),
        }
    }

    fn count(&self, class: &str) -> usize {
        self.class_details.get(class).map_or(0, |d| d.count)
    }

    fn percentage(&self, class: &str) -> f64 {
        self.class_details.get(class).map_or(0.0, |d| d.percentage)
    }

    /// Deterministic text summary handed to the model ahead of the user query.
    pub fn context_prompt(&self) -> String {
        let mut context = format!(
            "You are an AI assistant helping users explore the {name} dataset.\n\n\
             DATASET OVERVIEW:\n\
             - Dataset Name: {name}\n\
             - Total Classes: {classes}\n\
             - Total Images: {images}\n\
             - Total Files: {files}\n\n\
             FILE TYPES DISTRIBUTION:\n",
            name = self.dataset_name,
            classes = self.total_classes,
            images = self.total_images,
            files = self.total_files,
        );

        for (file_type, count) in &self.file_types {
            context.push_str(&format!("- {file_type}: {count} files\n"));
        }

        context.push_str(&format!("\nTOP {PROMPT_TOP_CLASSES} CLASSES BY IMAGE COUNT:\n"));
        for (i, class) in self.classes_by_count.iter().take(PROMPT_TOP_CLASSES).enumerate() {
            context.push_str(&format!(
                "{:2}. {}: {} images ({:.1}%)\n",
                i + 1,
                class,
                self.count(class),
                self.percentage(class)
            ));
        }
        if self.classes.len() > PROMPT_TOP_CLASSES {
            context.push_str(&format!(
                "... and {} more classes\n",
                self.classes.len() - PROMPT_TOP_CLASSES
            ));
        }

        if let Some(summary) = &self.summary {
            context.push_str(&format!(
                "\nDATASET STATISTICS:\n\
                 - Largest class: {} ({} images)\n\
                 - Smallest class: {} ({} images)\n\
                 - Average images per class: {:.1}\n\
                 - Maximum images in a class: {}\n\
                 - Minimum images in a class: {}\n",
                summary.largest_class,
                self.count(&summary.largest_class),
                summary.smallest_class,
                self.count(&summary.smallest_class),
                summary.avg_images_per_class,
                summary.max_images_per_class,
                summary.min_images_per_class,
            ));
        }

        context.push_str("\nALL AVAILABLE CLASSES:\n");
        let mut sorted = self.classes.clone();
        sorted.sort();
        for class in &sorted {
            context.push_str(&format!("- {class}\n"));
        }

        context.push_str(
            "\n\nINSTRUCTIONS:\n\
             You are helping users explore this image dataset. Provide accurate, specific, and helpful responses based on the data above.\n\n\
             - When asked about specific classes, provide exact counts and percentages\n\
             - When asked for comparisons, use the actual numbers\n\
             - When asked about finding specific types of images, suggest relevant classes\n\
             - If asked about statistics, reference the actual dataset statistics\n\
             - Be conversational but precise\n\
             - If you don't have specific information about something, clearly state that\n\
             - When suggesting classes, explain why they're relevant to the user's query\n",
        );

        context
    }

    /// Classes named in the query, plus classes belonging to a category the query mentions.
    pub fn relevant_classes(&self, query: &str) -> Vec<RelevantClass> {
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower.split_whitespace().collect();
        let mut relevant: Vec<RelevantClass> = Vec::new();

        for class in &self.classes {
            let class_lower = class.to_lowercase();
            if query_lower.contains(&class_lower) || words.iter().any(|w| class_lower.contains(w)) {
                relevant.push(self.relevant(class, "Class name matches query".to_string()));
            }
        }

        for (category, keywords) in CATEGORY_KEYWORDS {
            if !query_lower.contains(category) {
                continue;
            }
            for class in &self.classes {
                let class_lower = class.to_lowercase();
                if !keywords.iter().any(|k| class_lower.contains(k)) {
                    continue;
                }
                if relevant.iter().any(|r| &r.name == class) {
                    continue;
                }
                relevant.push(self.relevant(class, format!("Matches {category} category")));
            }
        }

        relevant.sort_by(|a, b| b.count.cmp(&a.count));
        relevant.truncate(MAX_MATCHES);
        relevant
    }

    fn relevant(&self, class: &str, reason: String) -> RelevantClass {
        RelevantClass {
            name: class.to_string(),
            count: self.count(class),
            percentage: self.percentage(class),
            reason,
        }
    }

    /// Class names containing `term`, case-insensitive, sorted.
    pub fn suggestions(&self, term: &str) -> Vec<String> {
        let term = term.to_lowercase();
        let mut suggestions: Vec<String> = self
            .classes
            .iter()
            .filter(|c| c.to_lowercase().contains(&term))
            .cloned()
            .collect();
        suggestions.sort();
        suggestions.truncate(MAX_MATCHES);
        suggestions
    }
}

/// indexed datasets keyed by name
#[derive(Default)]
pub struct SearchIndex {
    entries: DashMap<String, DatasetIndex>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// (re)index a dataset, replacing any earlier entry
    pub fn index(&self, dataset_name: &str, stats: &DatasetStats) -> DatasetIndex {
        let index = DatasetIndex::build(dataset_name, stats);
        tracing::info!(
            "📇 Dataset {} indexed with {} classes",
            dataset_name,
            index.classes.len()
        );
        self.entries.insert(dataset_name.to_string(), index.clone());
        index
    }

    pub fn is_indexed(&self, dataset_name: &str) -> bool {
        self.entries.contains_key(dataset_name)
    }

    pub fn get(&self, dataset_name: &str) -> Option<DatasetIndex> {
        self.entries.get(dataset_name).map(|entry| entry.clone())
    }

    pub fn remove(&self, dataset_name: &str) -> bool {
        self.entries.remove(dataset_name).is_some()
    }

    pub fn context_prompt(&self, dataset_name: &str) -> Option<String> {
        self.entries.get(dataset_name).map(|entry| entry.context_prompt())
    }

    pub fn relevant_classes(&self, dataset_name: &str, query: &str) -> Vec<RelevantClass> {
        self.entries
            .get(dataset_name)
            .map(|entry| entry.relevant_classes(query))
            .unwrap_or_default()
    }

    pub fn suggestions(&self, dataset_name: &str, term: &str) -> Vec<String> {
        self.entries
            .get(dataset_name)
            .map(|entry| entry.suggestions(term))
            .unwrap_or_default()
    }
}

/// Answer a free-text question about an indexed dataset.
///
/// Never fails: problems are reported through `success: false` and `error`.
pub async fn search(
    index: &SearchIndex,
    model: &dyn GenerativeModel,
    dataset_name: &str,
    query: &str,
) -> SearchResponse {
    // pull everything out of the map before awaiting
    let Some(entry) = index.get(dataset_name) else {
        return SearchResponse::failure(SearchError::NotIndexed(dataset_name.to_string()).to_string());
    };

    let prompt = format!(
        "\n{}\n\nUSER QUERY: {}\n\n\
         Please provide a helpful and accurate response based on the dataset information above. \
         Include specific numbers, class names, and actionable suggestions where relevant. \
         Be conversational and helpful.\n",
        entry.context_prompt(),
        query
    );

    tracing::debug!("Processing query for {}: {}", dataset_name, query);

    match model.generate(&prompt).await {
        Ok(text) => SearchResponse {
            success: true,
            response: Some(text),
            relevant_classes: Some(entry.relevant_classes(query)),
            dataset_stats: Some(SearchStats {
                total_classes: entry.total_classes,
                total_images: entry.total_images,
                query_processed: true,
            }),
            error: None,
        },
        Err(e) => {
            tracing::error!("Search failed for {}: {}", dataset_name, e);
            SearchResponse::failure(format!("Error processing query: {e}"))
        }
    }
}
