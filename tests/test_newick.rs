use phylostream::adapter::{StoredDocument, StoredTreeNetwork, StoredTreeNetworkGroup};
use phylostream::error::StreamErrorKind;
use phylostream::event::{ContentCategory, Event, EventPayload, EventReader, TopologyKind};
use phylostream::newick::scanner::{NewickScanner, NewickToken};
use phylostream::newick::{
    read_newick_document, read_newick_events, write_newick_string, NewickEventReader,
};
use phylostream::parser::TextParser;
use phylostream::ReadWriteParameterMap;

fn scan_all(input: &str) -> Vec<NewickToken> {
    let mut parser = TextParser::for_str(input);
    let mut scanner = NewickScanner::new(false);
    let mut tokens = Vec::new();
    while let Some(token) = scanner.next(&mut parser).unwrap() {
        tokens.push(token);
    }
    tokens
}

fn shapes(events: &[Event]) -> Vec<(ContentCategory, TopologyKind)> {
    events
        .iter()
        .map(|event| (event.category(), event.topology()))
        .collect()
}

// --- TESTS NEWICK SCANNING ---
#[test]
fn test_scanner_token_sequence() {
    let tokens = scan_all("(A:1.0,B:2.0)C:3.0;");
    assert_eq!(
        tokens,
        vec![
            NewickToken::SubtreeStart,
            NewickToken::Name { text: "A".to_string(), delimited: false },
            NewickToken::Length(1.0),
            NewickToken::ElementSeparator,
            NewickToken::Name { text: "B".to_string(), delimited: false },
            NewickToken::Length(2.0),
            NewickToken::SubtreeEnd,
            NewickToken::Name { text: "C".to_string(), delimited: false },
            NewickToken::Length(3.0),
            NewickToken::TerminalSymbol,
        ]
    );
}

#[test]
fn test_scanner_quoted_and_underscore_names() {
    let tokens = scan_all("('AB''C',New_Zealand);");
    assert_eq!(
        tokens[1],
        NewickToken::Name { text: "AB'C".to_string(), delimited: true }
    );
    assert_eq!(
        tokens[3],
        NewickToken::Name { text: "New Zealand".to_string(), delimited: false }
    );
}

#[test]
fn test_scanner_rooting_directives_and_comments() {
    let tokens = scan_all("[&r][a [nested] note](A);");
    assert_eq!(tokens[0], NewickToken::RootedCommand);
    assert_eq!(tokens[1], NewickToken::Comment("a [nested] note".to_string()));
    assert_eq!(scan_all("[&U](A);")[0], NewickToken::UnrootedCommand);
}

#[test]
fn test_scanner_rejects_invalid_branch_length() {
    let mut parser = TextParser::for_str("(A:abc);");
    let mut scanner = NewickScanner::new(false);
    scanner.next(&mut parser).unwrap(); // (
    scanner.next(&mut parser).unwrap(); // A
    let err = scanner.next(&mut parser).unwrap_err();
    assert!(matches!(err.kind(), StreamErrorKind::MalformedSyntax(_)));
}

// --- TESTS NEWICK EVENT READING ---
#[test]
fn test_basic_tree_events() {
    let events = read_newick_events("(A:1.0,B:2.0)C:3.0;").unwrap();
    assert_eq!(
        shapes(&events),
        vec![
            (ContentCategory::Document, TopologyKind::Start),
            (ContentCategory::TreeNetworkGroup, TopologyKind::Start),
            (ContentCategory::Tree, TopologyKind::Start),
            (ContentCategory::Node, TopologyKind::Start),
            (ContentCategory::Node, TopologyKind::End),
            (ContentCategory::Node, TopologyKind::Start),
            (ContentCategory::Node, TopologyKind::End),
            (ContentCategory::Node, TopologyKind::Start),
            (ContentCategory::Node, TopologyKind::End),
            (ContentCategory::Edge, TopologyKind::Start),
            (ContentCategory::Edge, TopologyKind::End),
            (ContentCategory::Edge, TopologyKind::Start),
            (ContentCategory::Edge, TopologyKind::End),
            (ContentCategory::RootEdge, TopologyKind::Start),
            (ContentCategory::RootEdge, TopologyKind::End),
            (ContentCategory::Tree, TopologyKind::End),
            (ContentCategory::TreeNetworkGroup, TopologyKind::End),
            (ContentCategory::Document, TopologyKind::End),
        ]
    );

    // Leaves are emitted before their parent, labels preserved
    let node_labels: Vec<&str> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::Node && e.topology() == TopologyKind::Start)
        .map(|e| e.label().unwrap())
        .collect();
    assert_eq!(node_labels, vec!["A", "B", "C"]);

    // Both edges leave C and carry the leaf branch lengths
    let c_id = events[7].id().unwrap();
    let edge_payloads: Vec<&EventPayload> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::Edge && e.topology() == TopologyKind::Start)
        .map(Event::payload)
        .collect();
    match edge_payloads[0] {
        EventPayload::EdgeInfo { source, target, length } => {
            assert_eq!(source.as_deref(), Some(c_id));
            assert_eq!(target, events[3].id().unwrap());
            assert_eq!(*length, Some(1.0));
        }
        other => panic!("unexpected edge payload {other:?}"),
    }
    match edge_payloads[1] {
        EventPayload::EdgeInfo { length, .. } => assert_eq!(*length, Some(2.0)),
        other => panic!("unexpected edge payload {other:?}"),
    }

    // The root branch length becomes a root edge without a source node
    let root_edge = events
        .iter()
        .find(|e| e.category() == ContentCategory::RootEdge && e.topology() == TopologyKind::Start)
        .unwrap();
    match root_edge.payload() {
        EventPayload::EdgeInfo { source, target, length } => {
            assert_eq!(*source, None);
            assert_eq!(target, c_id);
            assert_eq!(*length, Some(3.0));
        }
        other => panic!("unexpected root edge payload {other:?}"),
    }
}

#[test]
fn test_tree_without_root_length_has_no_root_edge() {
    let events = read_newick_events("(A,B);").unwrap();
    assert!(!events
        .iter()
        .any(|e| e.category() == ContentCategory::RootEdge));
}

#[test]
fn test_rooted_directive_adds_root_edge() {
    let events = read_newick_events("[&r](A:1,B:2);").unwrap();
    let root_edge = events
        .iter()
        .find(|e| e.category() == ContentCategory::RootEdge && e.topology() == TopologyKind::Start)
        .unwrap();
    match root_edge.payload() {
        EventPayload::EdgeInfo { source, length, .. } => {
            assert_eq!(*source, None);
            assert_eq!(*length, None);
        }
        other => panic!("unexpected root edge payload {other:?}"),
    }
}

#[test]
fn test_multiple_trees_share_one_group() {
    let events = read_newick_events("(A,B);\n(C,(D,E));\n").unwrap();
    let count = |category, topology| {
        events
            .iter()
            .filter(|e| e.category() == category && e.topology() == topology)
            .count()
    };
    assert_eq!(count(ContentCategory::Document, TopologyKind::Start), 1);
    assert_eq!(count(ContentCategory::TreeNetworkGroup, TopologyKind::Start), 1);
    assert_eq!(count(ContentCategory::Tree, TopologyKind::Start), 2);
    assert_eq!(count(ContentCategory::Tree, TopologyKind::End), 2);

    // All element IDs of one read are distinct
    let ids: Vec<&str> = events.iter().filter_map(Event::id).collect();
    let mut deduplicated = ids.clone();
    deduplicated.sort_unstable();
    deduplicated.dedup();
    assert_eq!(ids.len(), deduplicated.len());
}

#[test]
fn test_nhx_annotations_become_node_meta() {
    let events = read_newick_events("(A[&&NHX:S=human:B=1]:1.0,B:2.0);").unwrap();

    // The annotations nest inside node A, between its start and end events
    let a_start = events
        .iter()
        .position(|e| e.category() == ContentCategory::Node && e.label() == Some("A"))
        .unwrap();
    let a_end = events[a_start..]
        .iter()
        .position(|e| e.category() == ContentCategory::Node && e.topology() == TopologyKind::End)
        .unwrap()
        + a_start;
    let meta: Vec<&Event> = events[a_start + 1..a_end]
        .iter()
        .filter(|e| e.category() == ContentCategory::LiteralMeta && e.topology() == TopologyKind::Start)
        .collect();
    assert_eq!(meta.len(), 2);
    match meta[0].payload() {
        EventPayload::Literal { predicate, value, .. } => {
            assert_eq!(predicate, "S");
            assert_eq!(value.as_deref(), Some("human"));
        }
        other => panic!("unexpected meta payload {other:?}"),
    }
    match meta[1].payload() {
        EventPayload::Literal { predicate, value, .. } => {
            assert_eq!(predicate, "B");
            assert_eq!(value.as_deref(), Some("1"));
        }
        other => panic!("unexpected meta payload {other:?}"),
    }
    assert!(meta.iter().all(|e| e.id().is_some()));
    assert!(events[a_start + 1..a_end]
        .iter()
        .any(|e| e.category() == ContentCategory::LiteralMetaContent));
}

#[test]
fn test_long_comments_are_chunked() {
    let params = ReadWriteParameterMap::new().with_max_comment_length(4);
    let mut reader = NewickEventReader::new(TextParser::for_str("[hello world](A,B);"), params);
    let mut chunks = Vec::new();
    while let Some(event) = reader.next().unwrap() {
        if event.category() == ContentCategory::Comment {
            match event.payload() {
                EventPayload::CommentText { text, continued } => {
                    chunks.push((text.clone(), *continued));
                }
                other => panic!("unexpected comment payload {other:?}"),
            }
        }
    }
    assert_eq!(
        chunks,
        vec![
            ("hell".to_string(), true),
            ("o wo".to_string(), true),
            ("rld".to_string(), false),
        ]
    );
}

#[test]
fn test_extended_newick_links_hybrid_nodes() {
    let params = ReadWriteParameterMap::new().with_expect_extended_newick(true);
    let mut reader = NewickEventReader::new(TextParser::for_str("((A,#H1),(B,#H1));"), params);
    let mut nodes = Vec::new();
    while let Some(event) = reader.next().unwrap() {
        if event.category() == ContentCategory::Node && event.topology() == TopologyKind::Start {
            nodes.push(event);
        }
    }

    // The second #H1 occurrence links back to the node that introduced the tag
    let linked: Vec<&Event> = nodes.iter().filter(|e| e.linked_id().is_some()).collect();
    assert_eq!(linked.len(), 1);
    let target = linked[0].linked_id().unwrap();
    let first = nodes.iter().find(|e| e.id() == Some(target)).unwrap();
    assert_eq!(first.label(), None);

    // Without the parameter the tag is just part of the name
    let plain = read_newick_events("((A,#H1),(B,#H1));").unwrap();
    assert!(plain
        .iter()
        .filter(|e| e.category() == ContentCategory::Node)
        .all(|e| e.linked_id().is_none()));
}

#[test]
fn test_network_parameter_switches_category() {
    let params = ReadWriteParameterMap::new().with_consider_phylogeny_as_network(true);
    let mut reader = NewickEventReader::new(TextParser::for_str("(A,B);"), params);
    let mut saw_network = false;
    while let Some(event) = reader.next().unwrap() {
        assert_ne!(event.category(), ContentCategory::Tree);
        saw_network |= event.category() == ContentCategory::Network;
    }
    assert!(saw_network);
}

#[test]
fn test_unbalanced_tree_is_rejected() {
    assert!(matches!(
        read_newick_events("((A,B);").unwrap_err().kind(),
        StreamErrorKind::MalformedSyntax(_)
    ));
    assert!(matches!(
        read_newick_events("(A,B").unwrap_err().kind(),
        StreamErrorKind::UnexpectedEof
    ));
}

// --- TESTS NEWICK WRITING ---
#[test]
fn test_writer_round_trip() {
    let input = "((A:1,B:2)D:3,C:4);";
    let document = read_newick_document(input, ReadWriteParameterMap::default()).unwrap();
    assert_eq!(write_newick_string(&document).unwrap(), format!("{input}\n"));
}

#[test]
fn test_writer_escapes_labels() {
    let mut tree = StoredTreeNetwork::new("t1", None, true);
    tree.push_node("root", None);
    tree.push_node("a", Some("Baillon's Crake".to_string()));
    tree.push_node("b", Some("New Zealand Pigeon".to_string()));
    tree.push_edge("e1", Some("root".to_string()), "a", Some(1.0));
    tree.push_edge("e2", Some("root".to_string()), "b", Some(2.0));

    let mut group = StoredTreeNetworkGroup::new("g1", None, None);
    group.push(tree);
    let mut document = StoredDocument::new();
    document.push_tree_network_group(group);

    assert_eq!(
        write_newick_string(&document).unwrap(),
        "('Baillon''s Crake':1,New_Zealand_Pigeon:2);\n"
    );
}

#[test]
fn test_writer_rejects_broken_topologies() {
    // Edge to a node that was never declared
    let mut tree = StoredTreeNetwork::new("t1", None, true);
    tree.push_node("a", None);
    tree.push_edge("e1", Some("a".to_string()), "ghost", None);
    let mut group = StoredTreeNetworkGroup::new("g1", None, None);
    group.push(tree);
    let mut document = StoredDocument::new();
    document.push_tree_network_group(group);
    assert!(matches!(
        write_newick_string(&document).unwrap_err().kind(),
        StreamErrorKind::InconsistentAdapterData(_)
    ));

    // Edges forming a cycle below the root edge
    let mut tree = StoredTreeNetwork::new("t2", None, true);
    tree.push_node("a", None);
    tree.push_node("b", None);
    tree.push_edge("r", None, "a", None);
    tree.push_edge("e1", Some("a".to_string()), "b", None);
    tree.push_edge("e2", Some("b".to_string()), "a", None);
    let mut group = StoredTreeNetworkGroup::new("g2", None, None);
    group.push(tree);
    let mut document = StoredDocument::new();
    document.push_tree_network_group(group);
    assert!(matches!(
        write_newick_string(&document).unwrap_err().kind(),
        StreamErrorKind::InconsistentAdapterData(_)
    ));

    // Two parents for one node
    let mut tree = StoredTreeNetwork::new("t3", None, true);
    tree.push_node("a", None);
    tree.push_node("b", None);
    tree.push_node("c", None);
    tree.push_edge("r", None, "a", None);
    tree.push_edge("e1", Some("a".to_string()), "b", None);
    tree.push_edge("e2", Some("a".to_string()), "c", None);
    tree.push_edge("e3", Some("b".to_string()), "c", None);
    let mut group = StoredTreeNetworkGroup::new("g3", None, None);
    group.push(tree);
    let mut document = StoredDocument::new();
    document.push_tree_network_group(group);
    assert!(matches!(
        write_newick_string(&document).unwrap_err().kind(),
        StreamErrorKind::InconsistentAdapterData(_)
    ));
}
