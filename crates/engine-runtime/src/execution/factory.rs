use crate::error::SetupError;
use connectors::{
    credentials::Credentials,
    error::ConnectorError,
    file::{
        segment::layout::{read_segment_list, resolve_parts},
        tree,
    },
    index::{elastic::ElasticClient, mapping::FieldMapper, solr::SolrClient},
};
use engine_config::settings::{
    pipeline::PipelineSettings, sink::SinkSettings, source::SourceSettings,
};
use engine_core::{
    connectors::{
        sink::{Sink, elastic::ElasticSink, file::JsonLinesSink, solr::SolrSink},
        source::{
            PartitionLocator, PartitionOpener, SegmentPartOpener, WholeFileOpener,
            solr::SolrQueryOpener,
        },
    },
    parser::Parser,
};
use engine_processing::parse::{ContentParser, stored::StoredDocumentParser};
use std::sync::Arc;
use tracing::info;

pub type Locators = Box<dyn Iterator<Item = PartitionLocator> + Send>;

/// Where the partitions of a run come from and how each is opened.
pub struct SourcePlan {
    pub locators: Locators,
    pub opener: Box<dyn PartitionOpener>,
}

pub fn create_source(
    settings: &SourceSettings,
    pipeline: &PipelineSettings,
) -> Result<SourcePlan, SetupError> {
    let plan = match settings {
        SourceSettings::Segments { lists, segments } => {
            let mut all = segments.clone();
            for list in lists {
                let listed = read_segment_list(list).map_err(|err| SetupError::input(list, err))?;
                info!(list = %list.display(), segments = listed.len(), "Read segment list");
                all.extend(listed);
            }
            SourcePlan {
                locators: Box::new(resolve_parts(all)),
                opener: Box::new(SegmentPartOpener),
            }
        }
        SourceSettings::Directory { root } => SourcePlan {
            locators: Box::new(tree::walk(root)),
            opener: Box::new(WholeFileOpener),
        },
        SourceSettings::PathList { list } => SourcePlan {
            locators: Box::new(tree::list(list).map_err(|err| SetupError::input(list, err))?),
            opener: Box::new(WholeFileOpener),
        },
        SourceSettings::LinkList { list } => SourcePlan {
            locators: Box::new(
                tree::csv_links(list).map_err(|err| SetupError::input(list, err))?,
            ),
            opener: Box::new(WholeFileOpener),
        },
        SourceSettings::Solr {
            url,
            query,
            start,
            page_size,
            fields,
        } => {
            let client = SolrClient::new(url, pipeline.sink_request_timeout())?;
            SourcePlan {
                locators: Box::new(std::iter::once(PartitionLocator::new(url))),
                opener: Box::new(
                    SolrQueryOpener::new(client)
                        .with_query(query.clone())
                        .with_start(*start)
                        .with_page_size(*page_size)
                        .with_fields(fields.clone()),
                ),
            }
        }
    };

    info!(source = %settings.describe(), "Created record source");
    Ok(plan)
}

pub fn create_sink(
    settings: &SinkSettings,
    pipeline: &PipelineSettings,
) -> Result<Arc<dyn Sink>, SetupError> {
    let timeout = pipeline.sink_request_timeout();

    let sink: Arc<dyn Sink> = match settings {
        SinkSettings::Solr {
            url,
            field_map,
            eval,
        } => {
            let mapper = match field_map {
                Some(path) => FieldMapper::from_file(path).map_err(SetupError::FieldMap)?,
                None => FieldMapper::default(),
            }
            .with_eval(*eval);
            Arc::new(SolrSink::new(SolrClient::new(url, timeout)?, mapper))
        }
        SinkSettings::Elastic {
            url,
            index,
            credentials,
        } => {
            let creds = credentials
                .as_ref()
                .map(Credentials::load)
                .transpose()?
                .unwrap_or_default();

            let url = url
                .clone()
                .or_else(|| creds.url.clone())
                .ok_or_else(|| ConnectorError::MissingProperty("url".into()))?;
            let index = index
                .clone()
                .or_else(|| creds.index.clone())
                .ok_or_else(|| ConnectorError::MissingProperty("index".into()))?;

            let mut client = ElasticClient::new(&url, &index, timeout)?;
            if let Some((username, password)) = creds.basic_auth() {
                client = client.with_basic_auth(username, password);
            }
            Arc::new(ElasticSink::new(client))
        }
        SinkSettings::JsonLines { path } => Arc::new(JsonLinesSink::open(path)?),
    };

    info!(sink = sink.name(), "Created sink");
    Ok(sink)
}

/// Stored documents are re-parsed; everything else is raw content.
pub fn create_parser(settings: &SourceSettings) -> Arc<dyn Parser> {
    match settings {
        SourceSettings::Solr { .. } => Arc::new(StoredDocumentParser::new()),
        _ => Arc::new(ContentParser::new()),
    }
}
