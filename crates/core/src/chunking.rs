use crate::error::IngestError;
use crate::models::Chunk;
use crate::quality::QualityFilter;

pub const DEFAULT_MAX_PARA_CHARS: usize = 1_000;
pub const DEFAULT_MAX_LINE_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationConfig {
    /// Paragraphs longer than this (in chars) are split into line windows.
    pub max_para_chars: usize,
    pub max_line_window: usize,
    pub quality: QualityFilter,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_para_chars: DEFAULT_MAX_PARA_CHARS,
            max_line_window: DEFAULT_MAX_LINE_WINDOW,
            quality: QualityFilter::default(),
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_para_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_para_chars must be positive".to_string(),
            ));
        }
        if self.max_line_window == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_line_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn line_window(&self) -> usize {
        self.max_line_window.max(1)
    }
}

struct ChunkSequence<'a> {
    filter: &'a QualityFilter,
    last_id: u32,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkSequence<'a> {
    fn new(filter: &'a QualityFilter) -> Self {
        Self {
            filter,
            last_id: 0,
            chunks: Vec::new(),
        }
    }

    fn offer(&mut self, page_number: u32, candidate: String) {
        if !self.filter.is_valid(&candidate) {
            return;
        }
        self.last_id = self.last_id.saturating_add(1);
        self.chunks.push(Chunk::new(page_number, self.last_id, candidate));
    }

    fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

// Blank pages still consume a page number; chunk ids continue across pages.
pub fn segment_pages<S: AsRef<str>>(pages: &[S], config: &SegmentationConfig) -> Vec<Chunk> {
    let mut sequence = ChunkSequence::new(&config.quality);

    for (index, page) in pages.iter().enumerate() {
        let page_number = (index + 1) as u32;
        for candidate in page_candidates(page.as_ref(), config) {
            sequence.offer(page_number, candidate);
        }
    }

    sequence.finish()
}

pub fn chunk_ocr_lines<S: AsRef<str>>(
    pages: &[Vec<S>],
    config: &SegmentationConfig,
) -> Vec<Chunk> {
    let mut sequence = ChunkSequence::new(&config.quality);

    for (index, lines) in pages.iter().enumerate() {
        let page_number = (index + 1) as u32;
        for window in lines.chunks(config.line_window()) {
            let combined = window
                .iter()
                .map(|line| line.as_ref())
                .collect::<Vec<_>>()
                .join(" ");
            let combined = combined.trim();
            if !combined.is_empty() {
                sequence.offer(page_number, combined.to_string());
            }
        }
    }

    sequence.finish()
}

pub fn page_candidates(page_text: &str, config: &SegmentationConfig) -> Vec<String> {
    let mut paragraphs = paragraph_candidates(page_text);
    if paragraphs.is_empty() {
        paragraphs = sentence_candidates(page_text);
    }

    paragraphs
        .into_iter()
        .flat_map(|paragraph| {
            if paragraph.chars().count() <= config.max_para_chars {
                vec![paragraph]
            } else {
                line_windows(&paragraph, config.line_window())
            }
        })
        .collect()
}

pub fn paragraph_candidates(page_text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in page_text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut current, &mut paragraphs);
        } else {
            current.push(line);
        }
    }
    flush_paragraph(&mut current, &mut paragraphs);

    paragraphs
}

fn flush_paragraph(lines: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    let paragraph = lines.join("\n");
    let paragraph = paragraph.trim();
    if !paragraph.is_empty() {
        paragraphs.push(paragraph.to_string());
    }
    lines.clear();
}

/// Splits on a period followed by whitespace; every fragment ends with a period.
pub fn sentence_candidates(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch != '.' {
            continue;
        }
        if !chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            continue;
        }

        push_sentence(&text[start..index], &mut sentences);
        while chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            chars.next();
        }
        start = chars.peek().map_or(text.len(), |(next_index, _)| *next_index);
    }
    push_sentence(&text[start..], &mut sentences);

    sentences
}

fn push_sentence(fragment: &str, sentences: &mut Vec<String>) {
    let sentence = fragment.trim();
    if sentence.is_empty() {
        return;
    }
    if sentence.ends_with('.') {
        sentences.push(sentence.to_string());
    } else {
        sentences.push(format!("{sentence}."));
    }
}

fn line_windows(paragraph: &str, window: usize) -> Vec<String> {
    let lines = paragraph.lines().collect::<Vec<_>>();
    lines
        .chunks(window)
        .map(|block| block.join("\n").trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}
