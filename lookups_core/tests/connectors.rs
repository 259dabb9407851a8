#![cfg(feature = "all-connectors")]

mod common;

use common::StubUpstream;
use lookups_core::config::{LookupsConfig, SourceConfig, UnresolvedIdentifier};
use lookups_core::connectors::aopwiki::events::AopEventsConnector;
use lookups_core::connectors::aopwiki::relationships::AopRelationshipsConnector;
use lookups_core::connectors::aopwiki::AopWikiConnector;
use lookups_core::connectors::bao::BaoConnector;
use lookups_core::connectors::cellosaurus::CellosaurusConnector;
use lookups_core::connectors::compoundcloud::CompoundCloudConnector;
use lookups_core::connectors::crossref::CrossrefConnector;
use lookups_core::connectors::mimetypes::MimeTypesConnector;
use lookups_core::connectors::orcid::OrcidConnector;
use lookups_core::connectors::pubchem::PubChemConnector;
use lookups_core::connectors::ror::RorConnector;
use lookups_core::{build_registry, Connector, SearchRequest};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn ror_item(id: &str, name: &str) -> Value {
    json!({
        "id": format!("https://ror.org/{id}"),
        "names": [{"types": ["ror_display", "label"], "value": name}],
        "locations": [{"geonames_details": {"name": "Leipzig", "country_name": "Germany"}}],
        "established": 1409
    })
}

fn aop_index() -> Value {
    json!([
        {"id": 38, "title": "Protein Alkylation leading to Liver Fibrosis", "short_name": "Alkylation to fibrosis"},
        {"id": 144, "title": "Endocytotic lysosomal uptake leading to liver fibrosis", "short_name": "Lysosomal damage"},
        {"id": 7, "title": "Aromatase inhibition", "short_name": "Aromatase"}
    ])
}

#[tokio::test]
async fn blank_and_short_queries_never_reach_upstream() {
    let stub = StubUpstream::new().shared();
    let registry = build_registry(&LookupsConfig::default(), stub.clone());
    assert!(!registry.is_empty());

    for info in registry.list_providers() {
        let connector = registry.get_provider(&info.name).unwrap();
        for query in ["", "   ", "\t\n"] {
            let results = connector.search(SearchRequest::new(query)).await;
            assert!(results.is_empty(), "{} answered {query:?}", info.name);
        }
        let results = connector.search(SearchRequest::new("ab").with_limit(0)).await;
        assert!(results.is_empty(), "{} ignored limit 0", info.name);
    }
    // Crossref needs three characters.
    let crossref = registry.get_provider("crossref").unwrap();
    assert!(crossref.search(SearchRequest::new(" ab ")).await.is_empty());

    assert_eq!(stub.call_count(), 0, "unexpected calls: {:?}", stub.urls());
}

#[tokio::test]
async fn server_errors_degrade_to_empty_results() {
    let stub = StubUpstream::new().fail("", 500).shared();
    let registry = build_registry(&LookupsConfig::default(), stub.clone());

    for info in registry.list_providers() {
        let connector = registry.get_provider(&info.name).unwrap();
        let results = connector.search(SearchRequest::new("liver fibrosis")).await;
        assert!(results.is_empty(), "{} returned {results:?}", info.name);
    }
    assert!(stub.call_count() >= registry.len());
}

#[tokio::test]
async fn text_search_respects_limit_and_upstream_order() {
    let items: Vec<Value> = (0..25)
        .map(|i| ror_item(&format!("05{i:05}x{}", i % 10), &format!("Institute {i}")))
        .collect();
    let stub = StubUpstream::new()
        .route("/v2/organizations?", json!({"items": items}))
        .shared();
    let ror = RorConnector::new(SourceConfig::default(), stub.clone());

    let results = ror.search(SearchRequest::new("institute").with_limit(3)).await;
    let names: Vec<_> = results.iter().filter_map(|e| e.name()).collect();
    assert_eq!(names, vec!["Institute 0", "Institute 1", "Institute 2"]);

    let results = ror.search(SearchRequest::new("institute").with_limit(50)).await;
    assert_eq!(results.len(), 20);
    assert_eq!(stub.count("query=institute"), 2);
}

#[tokio::test]
async fn identifier_resolves_to_a_single_record() {
    let stub = StubUpstream::new()
        .route("/v2/organizations/03s7gtk40", ror_item("03s7gtk40", "Leipzig University"))
        .shared();
    let ror = RorConnector::new(SourceConfig::default(), stub.clone());

    let results = ror.search(SearchRequest::new("https://ror.org/03S7GTK40")).await;
    assert_eq!(results.len(), 1);
    let entity = &results[0];
    assert_eq!(entity.id(), Some("https://ror.org/03s7gtk40"));
    assert_eq!(entity.entity_type(), Some("Organization"));
    assert_eq!(entity.get_str("location"), Some("Leipzig, Germany"));
    assert_eq!(stub.urls(), vec!["https://api.ror.org/v2/organizations/03s7gtk40"]);
}

#[tokio::test]
async fn unresolved_identifier_falls_back_to_text_search() {
    let stub = StubUpstream::new()
        .fail("/v2/organizations/0abcdef12", 404)
        .route("/v2/organizations?", json!({"items": [ror_item("02mhbdp94", "Matched by text")]}))
        .shared();
    let ror = RorConnector::new(SourceConfig::default(), stub.clone());

    let results = ror.search(SearchRequest::new("0abcdef12")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name(), Some("Matched by text"));
    assert_eq!(stub.call_count(), 2);

    let strict = RorConnector::new(
        SourceConfig::default().on_unresolved(UnresolvedIdentifier::Empty),
        stub.clone(),
    );
    assert!(strict.search(SearchRequest::new("0abcdef12")).await.is_empty());
    assert_eq!(stub.call_count(), 3);
}

#[tokio::test]
async fn doi_lookup_bypasses_text_search() {
    let stub = StubUpstream::new()
        .route(
            "/works/10.1000%2Fxyz123",
            json!({"status": "ok", "message": {
                "DOI": "10.1000/xyz123",
                "title": ["An example work"],
                "author": [{"given": "Ada", "family": "Lovelace"}],
                "issued": {"date-parts": [[2020, 5]]}
            }}),
        )
        .route("/works?", json!({"message": {"items": []}}))
        .shared();
    let crossref = CrossrefConnector::new(SourceConfig::default(), stub.clone());

    let results = crossref.search(SearchRequest::new("10.1000/xyz123")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), Some("https://doi.org/10.1000/xyz123"));
    assert_eq!(results[0].entity_type(), Some("ScholarlyArticle"));
    assert_eq!(results[0].get_str("datePublished"), Some("2020-05"));
    assert_eq!(stub.urls(), vec!["https://api.crossref.org/works/10.1000%2Fxyz123"]);
}

#[tokio::test]
async fn unresolved_doi_returns_nothing_by_default() {
    let stub = StubUpstream::new()
        .fail("/works/", 404)
        .route("/works?", json!({"message": {"items": [{"DOI": "10.1/other", "title": ["Other"]}]}}))
        .shared();
    let crossref = CrossrefConnector::new(SourceConfig::default(), stub.clone());

    assert!(crossref.search(SearchRequest::new("doi:10.9999/missing")).await.is_empty());
    assert_eq!(stub.count("/works?"), 0);
}

#[tokio::test]
async fn media_type_search_matches_extensions() {
    let stub = StubUpstream::new()
        .route(
            "/db.json",
            json!({
                "application/json": {"source": "iana", "compressible": true, "extensions": ["json", "map"]},
                "application/xml": {"source": "iana", "extensions": ["xml"]},
                "text/plain": {"source": "iana", "extensions": ["txt", "text"]}
            }),
        )
        .shared();
    let mimetypes = MimeTypesConnector::new(SourceConfig::default(), stub.clone());

    let results = mimetypes.search(SearchRequest::new("json")).await;
    assert_eq!(results.len(), 1);
    let entity = &results[0];
    assert_eq!(entity.entity_type(), Some("MediaType"));
    assert_eq!(entity.name(), Some("application/json"));
    assert_eq!(entity.get("extensions"), Some(&json!([".json", ".map"])));

    let results = mimetypes.search(SearchRequest::new("TEXT/plain")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), Some("urn:mimetype:text/plain"));

    // The table is downloaded once per connector.
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn aop_details_are_fetched_once_across_searches() {
    let stub = StubUpstream::new()
        .route("/aops.json", aop_index())
        .route("/aops/38.json", json!({"source": "AOPWiki", "aop_mies": [{"event_id": 396, "event": "Protein Alkylation"}]}))
        .route("/aops/144.json", json!({"source": "AOPWiki"}))
        .with_delay(Duration::from_millis(20))
        .shared();
    let aopwiki = Arc::new(AopWikiConnector::new(SourceConfig::default(), stub.clone()));

    let (first, second) = tokio::join!(
        aopwiki.search(SearchRequest::new("fibrosis")),
        aopwiki.search(SearchRequest::new("LIVER"))
    );
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(first[0].id(), Some("https://aopwiki.org/aops/38"));
    assert_eq!(first[0].get_str("source"), Some("AOPWiki"));

    let by_id = aopwiki.search(SearchRequest::new("AOP:38")).await;
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0], first[0]);

    assert_eq!(stub.count("/aops.json"), 1);
    assert_eq!(stub.count("/aops/38.json"), 1);
    assert_eq!(stub.count("/aops/144.json"), 1);
    assert_eq!(stub.count("/aops/7.json"), 0);
}

#[tokio::test]
async fn aop_limit_bounds_detail_fan_out() {
    let stub = StubUpstream::new().route("/aops.json", aop_index()).shared();
    let aopwiki = AopWikiConnector::new(SourceConfig::default(), stub.clone());

    let results = aopwiki.search(SearchRequest::new("fibrosis").with_limit(1)).await;
    assert_eq!(results.len(), 1);
    // Detail failures still leave the index record.
    assert_eq!(results[0].get_str("title"), Some("Protein Alkylation leading to Liver Fibrosis"));
    assert_eq!(stub.count("/aops/"), 1);
}

#[tokio::test]
async fn relationship_identifier_resolves_without_listing() {
    let stub = StubUpstream::new()
        .route(
            "/relationships/1526.json",
            json!({
                "id": 1526,
                "events": {
                    "upstream_event": {"name": "Protein Alkylation"},
                    "downstream_event": {"name": "Cell injury/death"}
                }
            }),
        )
        .shared();
    let relationships = AopRelationshipsConnector::new(SourceConfig::default(), stub.clone());

    let results = relationships.search(SearchRequest::new("KER 1526")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name(), Some("Protein Alkylation → Cell injury/death"));
    assert_eq!(stub.count("/relationships.json"), 0);
}

#[tokio::test]
async fn relationship_text_search_scans_details() {
    let rel = |id: u32, up: &str, down: &str| {
        json!({"id": id, "events": {"upstream_event": {"name": up}, "downstream_event": {"name": down}}})
    };
    let stub = StubUpstream::new()
        .route("/relationships.json", json!([{"id": 1}, {"id": 2}, {"id": 3}]))
        .route("/relationships/1.json", rel(1, "Aromatase inhibition", "Reduced estradiol"))
        .route("/relationships/2.json", rel(2, "Protein Alkylation", "Liver fibrosis"))
        .route("/relationships/3.json", rel(3, "Hepatocyte death", "Liver fibrosis"))
        .shared();
    let relationships = AopRelationshipsConnector::new(SourceConfig::default(), stub.clone());

    let results = relationships.search(SearchRequest::new("fibrosis")).await;
    let ids: Vec<_> = results.iter().filter_map(|e| e.id()).collect();
    assert_eq!(
        ids,
        vec![
            "https://aopwiki.org/relationships/2",
            "https://aopwiki.org/relationships/3"
        ]
    );

    let again = relationships.search(SearchRequest::new("estradiol")).await;
    assert_eq!(again.len(), 1);
    assert_eq!(stub.count("/relationships/2.json"), 1);
    assert_eq!(stub.count("/relationships.json"), 1);
}

#[tokio::test]
async fn compound_synonyms_are_shared_between_suggestions() {
    let stub = StubUpstream::new()
        .route("/autocomplete/", json!({"dictionary_terms": {"compound": ["ethanol", "Ethanol", "ethanolamine"]}}))
        .route(
            "/name/ethanolamine/property/",
            json!({"PropertyTable": {"Properties": [{"CID": 700, "Title": "Ethanolamine"}]}}),
        )
        .route(
            "/property/",
            json!({"PropertyTable": {"Properties": [{"CID": 702, "Title": "Ethanol", "InChIKey": "LFQSCWFLJHTTHZ-UHFFFAOYSA-N"}]}}),
        )
        .route("/synonyms/", json!({"InformationList": {"Information": [{"Synonym": ["ethanol", "ethyl alcohol"]}]}}))
        .shared();
    let pubchem = PubChemConnector::new(SourceConfig::default(), stub.clone());

    let results = pubchem.search(SearchRequest::new("ethanol")).await;
    let cids: Vec<_> = results.iter().filter_map(|e| e.get("cid")).cloned().collect();
    assert_eq!(cids, vec![json!(702), json!(700)]);
    assert_eq!(results[0].get("synonym"), Some(&json!(["ethanol", "ethyl alcohol"])));
    assert_eq!(stub.count("/cid/702/synonyms/"), 1);
}

#[tokio::test]
async fn configured_fields_and_type_shape_records() {
    let stub = StubUpstream::new()
        .route(
            "/expanded-search/",
            json!({"expanded-result": [{
                "orcid-id": "0000-0002-1825-0097",
                "given-names": "Josiah",
                "family-names": "Carberry",
                "institution-name": ["Brown University"]
            }]}),
        )
        .shared();
    let config = SourceConfig::default()
        .with_fields(["name"])
        .with_type("Researcher")
        .with_header("Authorization", "Bearer token");
    let orcid = OrcidConnector::new(config, stub.clone());

    let results = orcid.search(SearchRequest::new("https://orcid.org/0000-0002-1825-0097")).await;
    assert_eq!(results.len(), 1);
    let keys: Vec<_> = results[0].keys().collect();
    assert_eq!(keys, vec!["@id", "@type", "name"]);
    assert_eq!(results[0].entity_type(), Some("Researcher"));
    assert_eq!(results[0].name(), Some("Josiah Carberry"));

    let request = &stub.requests()[0];
    assert!(request.url.contains("q=orcid%3A0000-0002-1825-0097"), "{}", request.url);
    assert_eq!(request.header_value("authorization"), Some("Bearer token"));
}

#[tokio::test]
async fn base_url_override_redirects_requests() {
    let stub = StubUpstream::new()
        .route("/lookup/crossref/works?", json!({"message": {"items": []}}))
        .shared();
    let crossref = CrossrefConnector::new(
        SourceConfig::default().with_base_url("http://localhost:5173/lookup/crossref/"),
        stub.clone(),
    );

    assert!(crossref.search(SearchRequest::new("liver fibrosis")).await.is_empty());
    assert_eq!(
        stub.urls(),
        vec!["http://localhost:5173/lookup/crossref/works?query=liver+fibrosis&rows=10"]
    );
}

fn cell_line(accession: &str, name: &str) -> Value {
    json!({
        "accession-list": [{"type": "primary", "value": accession}],
        "name-list": [{"type": "identifier", "value": name}],
        "species-list": [{"accession": "9606", "label": "Homo sapiens"}]
    })
}

#[tokio::test]
async fn cell_line_accession_is_looked_up_directly() {
    let stub = StubUpstream::new()
        .route(
            "/cell-line/CVCL_0030",
            json!({"Cellosaurus": {"cell-line-list": [cell_line("CVCL_0030", "HeLa")]}}),
        )
        .shared();
    let cellosaurus = CellosaurusConnector::new(SourceConfig::default(), stub.clone());

    let results = cellosaurus.search(SearchRequest::new("cvcl:0030")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), Some("https://www.cellosaurus.org/CVCL_0030"));
    assert_eq!(results[0].name(), Some("HeLa"));
    assert_eq!(results[0].entity_type(), Some("CellLine"));
    assert_eq!(
        stub.urls(),
        vec!["https://api.cellosaurus.org/cell-line/CVCL_0030?format=json"]
    );
}

#[tokio::test]
async fn cell_line_text_search_drops_entries_without_identity() {
    let stub = StubUpstream::new()
        .route(
            "/search/cell-line",
            json!({"Cellosaurus": {"cell-line-list": [
                cell_line("CVCL_0030", "HeLa"),
                {"species-list": [{"label": "Homo sapiens"}]},
                cell_line("CVCL_1922", "HeLa S3"),
                cell_line("CVCL_2260", "HeLa 229")
            ]}}),
        )
        .shared();
    let cellosaurus = CellosaurusConnector::new(SourceConfig::default(), stub.clone());

    let results = cellosaurus.search(SearchRequest::new("HeLa").with_limit(2)).await;
    let names: Vec<_> = results.iter().filter_map(|e| e.name()).collect();
    assert_eq!(names, vec!["HeLa", "HeLa S3"]);
    assert_eq!(results[0].get("species"), Some(&json!(["Homo sapiens"])));
    assert_eq!(
        stub.urls(),
        vec!["https://api.cellosaurus.org/search/cell-line?q=HeLa&rows=2"]
    );
}

fn bao_doc(id: &str, label: &str) -> Value {
    json!({
        "iri": format!("http://www.bioassayontology.org/bao#BAO_{id}"),
        "label": label,
        "description": [format!("{label} description")],
        "short_form": format!("BAO_{id}"),
        "obo_id": format!("BAO:{id}"),
        "ontology_name": "bao",
        "ontology_iri": "http://www.bioassayontology.org/bao/bao_complete.owl",
        "is_obsolete": false
    })
}

#[tokio::test]
async fn bao_term_lookup_uses_the_obo_id() {
    let mut term = bao_doc("0000015", "bioassay");
    term["synonyms"] = json!(["assay"]);
    let stub = StubUpstream::new()
        .route("/api/ontologies/bao/terms", json!({"_embedded": {"terms": [term]}}))
        .shared();
    let bao = BaoConnector::new(SourceConfig::default(), stub.clone());

    let results = bao.search(SearchRequest::new("BAO_0000015")).await;
    assert_eq!(results.len(), 1);
    let entity = &results[0];
    assert_eq!(entity.id(), Some("http://www.bioassayontology.org/bao#BAO_0000015"));
    assert_eq!(entity.get("synonym"), Some(&json!(["assay"])));
    assert_eq!(entity.get_str("oboId"), Some("BAO:0000015"));
    assert!(!entity.contains("ontologyIri"));
    assert!(!entity.contains("isObsolete"));
    assert_eq!(
        stub.urls(),
        vec!["https://www.ebi.ac.uk/ols4/api/ontologies/bao/terms?obo_id=BAO%3A0000015"]
    );
}

#[tokio::test]
async fn bao_text_search_dedups_by_iri() {
    let stub = StubUpstream::new()
        .route(
            "/api/search",
            json!({"response": {"docs": [
                bao_doc("0000015", "bioassay"),
                bao_doc("0000015", "bioassay"),
                bao_doc("0002989", "assay method")
            ]}}),
        )
        .shared();
    let bao = BaoConnector::new(SourceConfig::default(), stub.clone());

    let results = bao.search(SearchRequest::new("assay").with_limit(5)).await;
    let names: Vec<_> = results.iter().filter_map(|e| e.name()).collect();
    assert_eq!(names, vec!["bioassay", "assay method"]);
    assert!(stub.urls()[0].contains("rows=20"), "{}", stub.urls()[0]);
}

#[tokio::test]
async fn bao_row_count_saturates_for_huge_limits() {
    let stub = StubUpstream::new()
        .route("/api/search", json!({"response": {"docs": [bao_doc("0000015", "bioassay")]}}))
        .shared();
    let bao = BaoConnector::new(SourceConfig::default(), stub.clone());

    let results = bao.search(SearchRequest::new("assay").with_limit(usize::MAX)).await;
    assert_eq!(results.len(), 1);
    assert!(stub.urls()[0].contains("rows=100"), "{}", stub.urls()[0]);
}

fn compound_entity(qid: &str, label: &str) -> Value {
    json!({"entities": {qid: {
        "id": qid,
        "labels": {"en": {"language": "en", "value": label}},
        "aliases": {"en": [{"value": format!("{label} alias")}]}
    }}})
}

fn compound_binding(qid: &str, label: &str) -> Value {
    json!({
        "item": {"value": format!("https://compoundcloud.wikibase.cloud/entity/{qid}")},
        "itemLabel": {"value": label}
    })
}

#[tokio::test]
async fn compound_entities_are_fetched_once_per_item() {
    let stub = StubUpstream::new()
        .route(
            "/query/sparql",
            json!({"results": {"bindings": [
                compound_binding("Q2270", "ethanol"),
                compound_binding("Q2270", "Ethanol"),
                compound_binding("Q5", "ethanolamine"),
                compound_binding("Q9", "ethanol dimer")
            ]}}),
        )
        .route("EntityData/Q2270.json", compound_entity("Q2270", "ethanol"))
        .route("EntityData/Q5.json", compound_entity("Q5", "ethanolamine"))
        .shared();
    let compounds = CompoundCloudConnector::new(SourceConfig::default(), stub.clone());

    for _ in 0..2 {
        let results = compounds.search(SearchRequest::new("ethanol").with_limit(2)).await;
        let ids: Vec<_> = results.iter().filter_map(|e| e.get_str("wikibaseId")).collect();
        assert_eq!(ids, vec!["Q2270", "Q5"]);
    }
    let direct = compounds.search(SearchRequest::new("q5")).await;
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].name(), Some("ethanolamine"));

    assert_eq!(stub.count("/query/sparql"), 2);
    assert_eq!(stub.count("EntityData/Q2270.json"), 1);
    assert_eq!(stub.count("EntityData/Q5.json"), 1);
    assert_eq!(stub.count("EntityData/Q9.json"), 0);

    let sparql = stub
        .requests()
        .into_iter()
        .find(|request| request.url.contains("/query/sparql"))
        .unwrap();
    assert_eq!(
        sparql.header_value("accept"),
        Some("application/sparql-results+json, application/json")
    );
}

#[tokio::test]
async fn compound_fan_out_moves_past_failed_items() {
    let stub = StubUpstream::new()
        .route(
            "/query/sparql",
            json!({"results": {"bindings": [
                compound_binding("Q9", "ethanol dimer"),
                compound_binding("Q2270", "ethanol"),
                compound_binding("Q5", "ethanolamine")
            ]}}),
        )
        .route("EntityData/Q2270.json", compound_entity("Q2270", "ethanol"))
        .route("EntityData/Q5.json", compound_entity("Q5", "ethanolamine"))
        .shared();
    let compounds = CompoundCloudConnector::new(SourceConfig::default(), stub.clone());

    let results = compounds.search(SearchRequest::new("ethanol").with_limit(2)).await;
    let ids: Vec<_> = results.iter().filter_map(|e| e.get_str("wikibaseId")).collect();
    assert_eq!(ids, vec!["Q2270", "Q5"]);
    assert_eq!(stub.count("EntityData/Q9.json"), 1);
}

fn event_index() -> Value {
    json!([
        {"id": 18, "title": "Inhibition, Aromatase", "short_name": "Aromatase inhibition", "biological_organization": {"term": "Molecular"}},
        {"id": 55, "title": "Cell death", "biological_organization": "Cellular"},
        {"id": 1, "title": "Liver fibrosis", "biological_organization": {"term": "Tissue"}}
    ])
}

#[tokio::test]
async fn event_search_reads_type_from_details() {
    let stub = StubUpstream::new()
        .route("/events.json", event_index())
        .route("/events/18.json", json!({"molecular_initiating_event": true}))
        .shared();
    let events = AopEventsConnector::new(SourceConfig::default(), stub.clone());

    let results = events.search(SearchRequest::new("molecular")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id(), Some("https://aopwiki.org/events/18"));
    assert_eq!(results[0].get_str("eventType"), Some("Molecular Initiating Event"));

    let results = events.search(SearchRequest::new("cell")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name(), Some("Cell death"));
    assert_eq!(results[0].get_str("eventType"), Some("Key Event"));
    assert_eq!(results[0].get_str("biologicalOrganization"), Some("Cellular"));

    let results = events.search(SearchRequest::new("KE 18")).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name(), Some("Inhibition, Aromatase"));

    assert_eq!(stub.count("/events.json"), 1);
    assert_eq!(stub.count("/events/18.json"), 1);
}

#[tokio::test]
async fn researcher_text_search_keeps_upstream_order() {
    let stub = StubUpstream::new()
        .route(
            "/expanded-search/",
            json!({"expanded-result": [
                {
                    "orcid-id": "0000-0002-1825-0097",
                    "given-names": "Josiah",
                    "family-names": "Carberry",
                    "institution-name": ["Brown University", null, "Wesleyan University"]
                },
                {"orcid-id": "0000-0001-5109-3700"},
                {"given-names": "No", "family-names": "Identifier"}
            ]}),
        )
        .shared();
    let orcid = OrcidConnector::new(SourceConfig::default(), stub.clone());

    let results = orcid.search(SearchRequest::new("carberry").with_limit(5)).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id(), Some("https://orcid.org/0000-0002-1825-0097"));
    assert_eq!(results[0].name(), Some("Josiah Carberry"));
    assert_eq!(
        results[0].get("affiliation"),
        Some(&json!(["Brown University", "Wesleyan University"]))
    );
    assert_eq!(results[1].name(), Some("0000-0001-5109-3700"));
    assert_eq!(
        stub.urls(),
        vec!["https://pub.orcid.org/v3.0/expanded-search/?q=carberry&rows=5"]
    );
}
