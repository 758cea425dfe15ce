use model::records::document::Document;

/// Documents waiting to be written, in arrival order.
#[derive(Debug)]
pub struct CommitBuffer {
    docs: Vec<Document>,
    threshold: usize,
}

impl CommitBuffer {
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        CommitBuffer {
            docs: Vec::with_capacity(threshold),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn push_all(&mut self, docs: impl IntoIterator<Item = Document>) {
        self.docs.extend(docs);
    }

    pub fn should_flush(&self) -> bool {
        self.docs.len() >= self.threshold
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }
}
