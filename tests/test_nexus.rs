use phylostream::adapter::{StoredDocument, StoredMatrix, StoredObjectList};
use phylostream::adapter::{
    MatrixDataAdapter, ObjectListAdapter, TreeNetworkDataAdapter, TreeNetworkGroupAdapter,
};
use phylostream::error::StreamErrorKind;
use phylostream::event::{
    ContentCategory, Event, EventPayload, EventReader, GrammarChecker, TopologyKind,
};
use phylostream::nexus::{
    read_nexus_document, read_nexus_events, write_nexus_string, NexusEventReader,
};
use phylostream::parser::TextParser;
use phylostream::ReadWriteParameterMap;
use rstest::rstest;
use std::collections::HashMap;

/// Label -> ID map of all Otu start events in a stream.
fn otu_ids_by_label(events: &[Event]) -> HashMap<String, String> {
    events
        .iter()
        .filter(|e| e.category() == ContentCategory::Otu && e.topology() == TopologyKind::Start)
        .map(|e| (e.label().unwrap().to_string(), e.id().unwrap().to_string()))
        .collect()
}

fn otu_labels(list: &StoredObjectList) -> Vec<String> {
    list.id_iterator()
        .map(|id| list.start_event(&id).unwrap().label().unwrap().to_string())
        .collect()
}

fn matrix_row(matrix: &StoredMatrix, label: &str) -> Vec<String> {
    let id = matrix
        .id_iterator()
        .find(|id| matrix.start_event(id).unwrap().label() == Some(label))
        .unwrap();
    matrix.tokens(&id).unwrap().to_vec()
}

fn sorted_edge_lengths(tree: &dyn TreeNetworkDataAdapter) -> Vec<f64> {
    let mut lengths: Vec<f64> = tree
        .edge_ids()
        .map(|id| match tree.edge_start_event(&id).unwrap().payload() {
            EventPayload::EdgeInfo { length, .. } => length.unwrap_or(f64::NAN),
            other => panic!("unexpected edge payload {other:?}"),
        })
        .collect();
    lengths.sort_by(f64::total_cmp);
    lengths
}

// --- TESTS BLOCK FRAMING ---
#[test]
fn test_header_is_required() {
    let err = read_nexus_events("BEGIN TAXA; END;").unwrap_err();
    assert!(matches!(err.kind(), StreamErrorKind::MalformedSyntax(_)));
}

#[test]
fn test_taxa_block_events() {
    let events = read_nexus_events(
        "#NEXUS\nBEGIN TAXA;\n\tDIMENSIONS NTAX=3;\n\tTAXLABELS Kea Kaka Kakapo;\nEND;\n",
    )
    .unwrap();

    let list_start = events
        .iter()
        .find(|e| e.category() == ContentCategory::OtuList && e.topology() == TopologyKind::Start)
        .unwrap();
    assert!(list_start.id().is_some());
    assert_eq!(list_start.label(), None);

    let labels: Vec<&str> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::Otu && e.topology() == TopologyKind::Start)
        .map(|e| e.label().unwrap())
        .collect();
    assert_eq!(labels, vec!["Kea", "Kaka", "Kakapo"]);
    assert!(events
        .iter()
        .any(|e| e.category() == ContentCategory::OtuList && e.topology() == TopologyKind::End));
}

#[test]
fn test_title_labels_the_block_element() {
    let events = read_nexus_events(
        "#NEXUS\nBEGIN TAXA; TITLE birds; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;",
    )
    .unwrap();
    let list_start = events
        .iter()
        .find(|e| e.category() == ContentCategory::OtuList && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(list_start.label(), Some("birds"));
}

#[test]
fn test_link_selects_the_titled_otu_list() {
    let events = read_nexus_events(
        "#NEXUS\n\
         BEGIN TAXA; TITLE one; DIMENSIONS NTAX=1; TAXLABELS Kea; END;\n\
         BEGIN TAXA; TITLE two; DIMENSIONS NTAX=1; TAXLABELS Kaka; END;\n\
         BEGIN CHARACTERS; LINK TAXA = one; DIMENSIONS NCHAR=2; MATRIX Kea AC; END;\n\
         BEGIN TREES; LINK TAXA = two; TREE t = (Kea,Kaka); END;\n",
    )
    .unwrap();

    let list_id = |title: &str| {
        events
            .iter()
            .find(|e| {
                e.category() == ContentCategory::OtuList
                    && e.topology() == TopologyKind::Start
                    && e.label() == Some(title)
            })
            .unwrap()
            .id()
    };

    // LINK TAXA names a TITLE, not the most recently opened list
    let alignment = events
        .iter()
        .find(|e| e.category() == ContentCategory::Alignment && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(alignment.linked_id(), list_id("one"));

    let group = events
        .iter()
        .find(|e| e.category() == ContentCategory::TreeNetworkGroup && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(group.linked_id(), list_id("two"));
}

#[test]
fn test_labels_with_spaces_survive_the_round_trip() {
    let input =
        "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS 'Great Spotted Kiwi' Kea; END;\n";
    let params = ReadWriteParameterMap::default();
    let first = read_nexus_document(input, params.clone()).unwrap();
    assert_eq!(
        otu_labels(&first.stored_otu_lists()[0]),
        vec!["Great Spotted Kiwi", "Kea"]
    );

    let text = write_nexus_string(&first, params.clone()).unwrap();
    let second = read_nexus_document(&text, params).unwrap();
    assert_eq!(
        otu_labels(&second.stored_otu_lists()[0]),
        vec!["Great Spotted Kiwi", "Kea"]
    );

    // An unquoted underscore spells the same label
    let events = read_nexus_events(
        "#NEXUS\nBEGIN TAXA; DIMENSIONS NTAX=1; TAXLABELS Great_Spotted_Kiwi; END;\n",
    )
    .unwrap();
    assert!(otu_ids_by_label(&events).contains_key("Great Spotted Kiwi"));
}

#[test]
fn test_writer_keeps_space_and_underscore_labels_distinct() {
    let mut list = StoredObjectList::new("otus0", None);
    list.push_otu("otu1", "a b");
    list.push_otu("otu2", "a_b");
    let mut document = StoredDocument::new();
    document.push_otu_list(list);

    let params = ReadWriteParameterMap::default();
    let text = write_nexus_string(&document, params.clone()).unwrap();
    // The space folds into an underscore; the literal underscore is quoted
    assert!(text.contains(" a_b"));
    assert!(text.contains(" 'a_b'"));

    let reread = read_nexus_document(&text, params).unwrap();
    assert_eq!(otu_labels(&reread.stored_otu_lists()[0]), vec!["a b", "a_b"]);
}

#[test]
fn test_unknown_commands_surface_as_events() {
    let events = read_nexus_events(
        "#NEXUS\nBEGIN ASSUMPTIONS;\nOPTIONS DEFTYPE = unord;\nEND;\n",
    )
    .unwrap();
    let unknown = events
        .iter()
        .find(|e| e.category() == ContentCategory::UnknownCommand)
        .unwrap();
    assert_eq!(unknown.topology(), TopologyKind::Sole);
    assert_eq!(unknown.label(), Some("OPTIONS"));
    assert_eq!(
        unknown.payload(),
        &EventPayload::Text("DEFTYPE = unord".to_string())
    );
}

#[test]
fn test_unknown_commands_keep_comment_semicolons() {
    let events = read_nexus_events(
        "#NEXUS\nBEGIN ASSUMPTIONS;\nOPTIONS [see; notes] DEFTYPE = unord;\nEND;\n",
    )
    .unwrap();

    // The ';' inside the comment does not end the command
    let unknown = events
        .iter()
        .find(|e| e.category() == ContentCategory::UnknownCommand)
        .unwrap();
    assert_eq!(
        unknown.payload(),
        &EventPayload::Text("DEFTYPE = unord".to_string())
    );
    assert!(events.iter().any(|e| {
        e.category() == ContentCategory::Comment
            && matches!(e.payload(), EventPayload::CommentText { text, .. } if text == "see; notes")
    }));
}

// --- TESTS CHARACTER BLOCKS ---
#[test]
fn test_characters_block_with_format() {
    let events = read_nexus_events(
        "#NEXUS\n\
         BEGIN TAXA;\n\tDIMENSIONS NTAX=2;\n\tTAXLABELS Kea Kaka;\nEND;\n\
         BEGIN CHARACTERS;\n\tDIMENSIONS NCHAR=4;\n\tFORMAT DATATYPE=DNA MISSING=? GAP=-;\n\
         \tMATRIX\n\t\tKea ACGT\n\t\tKaka AC-T\n\t;\nEND;\n",
    )
    .unwrap();

    let list_start = events
        .iter()
        .find(|e| e.category() == ContentCategory::OtuList && e.topology() == TopologyKind::Start)
        .unwrap();
    let alignment = events
        .iter()
        .find(|e| e.category() == ContentCategory::Alignment && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(alignment.linked_id(), list_start.id());

    // FORMAT becomes one token set definition
    let token_set = events
        .iter()
        .find(|e| e.category() == ContentCategory::TokenSetDefinition && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(token_set.label(), Some("DNA"));
    let single_tokens: Vec<(&str, &EventPayload)> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::SingleTokenDefinition)
        .map(|e| (e.label().unwrap(), e.payload()))
        .collect();
    assert_eq!(
        single_tokens,
        vec![
            ("missing", &EventPayload::Token("?".to_string())),
            ("gap", &EventPayload::Token("-".to_string())),
        ]
    );

    // Rows link their OTUs and carry the character tokens
    let otus = otu_ids_by_label(&events);
    let kea = events
        .iter()
        .find(|e| e.category() == ContentCategory::Sequence && e.label() == Some("Kea"))
        .unwrap();
    assert_eq!(kea.linked_id(), otus.get("Kea").map(String::as_str));
    let rows: Vec<&EventPayload> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::SequenceTokens)
        .map(Event::payload)
        .collect();
    let expected: Vec<String> = "ACGT".chars().map(|c| c.to_string()).collect();
    assert_eq!(rows[0], &EventPayload::Tokens(expected));
}

#[test]
fn test_interleaved_matrix_resumes_rows() {
    let input = "#NEXUS\n\
                 BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS A B; END;\n\
                 BEGIN CHARACTERS;\n\
                 DIMENSIONS NCHAR=8;\n\
                 FORMAT INTERLEAVE;\n\
                 MATRIX\n\
                 A ACGT\n\
                 B TTTT\n\
                 \n\
                 A CCCC\n\
                 B GGGG\n\
                 ;\n\
                 END;\n";
    let events = read_nexus_events(input).unwrap();

    // Each interleave row ends with a part end, same ID resuming later
    let part_ends = events
        .iter()
        .filter(|e| {
            e.category() == ContentCategory::Sequence
                && e.topology() == TopologyKind::End
                && !e.is_terminated()
        })
        .count();
    assert_eq!(part_ends, 4);
    let starts: Vec<&str> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::Sequence && e.topology() == TopologyKind::Start)
        .map(|e| e.id().unwrap())
        .collect();
    // Two pages plus one terminating resume per row at the matrix end
    assert_eq!(starts.len(), 6);
    assert_eq!(starts[0], starts[2]);
    assert_eq!(starts[2], starts[4]);
    assert_eq!(starts[1], starts[3]);
    assert_eq!(starts[3], starts[5]);
    let terminated_ends = events
        .iter()
        .filter(|e| {
            e.category() == ContentCategory::Sequence
                && e.topology() == TopologyKind::End
                && e.is_terminated()
        })
        .count();
    assert_eq!(terminated_ends, 2);

    // Loading concatenates the parts into one row per sequence
    let document = read_nexus_document(input, ReadWriteParameterMap::default()).unwrap();
    let matrix = &document.stored_matrices()[0];
    assert_eq!(matrix.count(), 2);
    assert_eq!(matrix_row(matrix, "A").concat(), "ACGTCCCC");
    assert_eq!(matrix_row(matrix, "B").concat(), "TTTTGGGG");
    assert_eq!(matrix.column_count(), Some(8));
}

#[test]
fn test_matrix_rows_end_at_newline_without_nchar() {
    let document = read_nexus_document(
        "#NEXUS\nBEGIN DATA;\nMATRIX\nA ACGT\nB GGC\n;\nEND;\n",
        ReadWriteParameterMap::default(),
    )
    .unwrap();
    let matrix = &document.stored_matrices()[0];
    assert_eq!(matrix_row(matrix, "A").concat(), "ACGT");
    assert_eq!(matrix_row(matrix, "B").concat(), "GGC");
    // Ragged rows leave the column count undefined
    assert_eq!(matrix.column_count(), None);
}

// --- TESTS TREES BLOCKS ---
#[test]
fn test_translate_and_tree() {
    let input = "#NEXUS\n\
                 BEGIN TAXA;\n\tDIMENSIONS NTAX=3;\n\tTAXLABELS Kea Kaka Kakapo;\nEND;\n\
                 BEGIN TREES;\n\
                 \tTRANSLATE 1 Kea, 2 Kaka, 3 Kakapo;\n\
                 \tTREE spine = ((1:1.0,2:1.0):0.5,3:1.5);\n\
                 END;\n";
    let events = read_nexus_events(input).unwrap();

    let list_start = events
        .iter()
        .find(|e| e.category() == ContentCategory::OtuList && e.topology() == TopologyKind::Start)
        .unwrap();
    let group = events
        .iter()
        .find(|e| e.category() == ContentCategory::TreeNetworkGroup && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(group.linked_id(), list_start.id());

    let tree = events
        .iter()
        .find(|e| e.category() == ContentCategory::Tree && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(tree.label(), Some("spine"));

    // Leaf names are TRANSLATE keys; each leaf links its OTU
    let otus = otu_ids_by_label(&events);
    let leaf = |key: &str| {
        events
            .iter()
            .find(|e| e.category() == ContentCategory::Node && e.label() == Some(key))
            .unwrap()
    };
    assert_eq!(leaf("1").linked_id(), otus.get("Kea").map(String::as_str));
    assert_eq!(leaf("3").linked_id(), otus.get("Kakapo").map(String::as_str));

    // With the fallback parameter the leaves take their taxon labels
    let params = ReadWriteParameterMap::new().with_use_otu_label_as_node_label(true);
    let mut reader = NexusEventReader::new(TextParser::for_str(input), params);
    let mut node_labels = Vec::new();
    while let Some(event) = reader.next().unwrap() {
        if event.category() == ContentCategory::Node && event.topology() == TopologyKind::Start {
            if let Some(label) = event.label() {
                node_labels.push(label.to_string());
            }
        }
    }
    assert_eq!(node_labels, vec!["Kea", "Kaka", "Kakapo"]);
}

// --- TESTS SETS BLOCKS ---
#[rstest]
#[case("1-3 5", vec![(0, 3), (4, 5)])]
#[case("ALL", vec![(0, 7)])]
#[case(".", vec![(6, 7)])]
#[case("2-6\\2", vec![(1, 2), (3, 4), (5, 6)])]
fn test_charset_standard_encoding(#[case] definition: &str, #[case] expected: Vec<(u64, u64)>) {
    let input = format!(
        "#NEXUS\n\
         BEGIN TAXA; DIMENSIONS NTAX=3; TAXLABELS A B C; END;\n\
         BEGIN CHARACTERS; DIMENSIONS NCHAR=7; MATRIX A AAAAAAA B CCCCCCC C GGGGGGG; END;\n\
         BEGIN SETS; CHARSET stem = {definition}; END;\n"
    );
    let events = read_nexus_events(&input).unwrap();

    let alignment = events
        .iter()
        .find(|e| e.category() == ContentCategory::Alignment && e.topology() == TopologyKind::Start)
        .unwrap();
    let set_start = events
        .iter()
        .find(|e| e.category() == ContentCategory::CharacterSet && e.topology() == TopologyKind::Start)
        .unwrap();
    assert_eq!(set_start.label(), Some("stem"));
    assert_eq!(set_start.linked_id(), alignment.id());

    let intervals: Vec<(u64, u64)> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::CharacterSetInterval)
        .map(|e| match e.payload() {
            EventPayload::Interval { first, last } => (*first, *last),
            other => panic!("unexpected interval payload {other:?}"),
        })
        .collect();
    assert_eq!(intervals, expected);
}

#[test]
fn test_charset_vector_encoding() {
    let events = read_nexus_events(
        "#NEXUS\n\
         BEGIN CHARACTERS; DIMENSIONS NCHAR=7; MATRIX A AAAAAAA; END;\n\
         BEGIN SETS; CHARSET mid (VECTOR) = 0011100; END;\n",
    )
    .unwrap();
    let intervals: Vec<(u64, u64)> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::CharacterSetInterval)
        .map(|e| match e.payload() {
            EventPayload::Interval { first, last } => (*first, *last),
            other => panic!("unexpected interval payload {other:?}"),
        })
        .collect();
    assert_eq!(intervals, vec![(2, 5)]);
}

#[test]
fn test_taxon_and_tree_sets() {
    let events = read_nexus_events(
        "#NEXUS\n\
         BEGIN TAXA; DIMENSIONS NTAX=3; TAXLABELS Kea Kaka Kakapo; END;\n\
         BEGIN TREES;\n\
         TRANSLATE 1 Kea, 2 Kaka, 3 Kakapo;\n\
         TREE one = (1,2);\n\
         TREE two = (2,3);\n\
         END;\n\
         BEGIN SETS;\n\
         TAXSET pair = Kea Kakapo;\n\
         TREESET first = 1;\n\
         END;\n",
    )
    .unwrap();

    let otus = otu_ids_by_label(&events);
    let elements_of = |category: ContentCategory| -> Vec<&str> {
        let start = events
            .iter()
            .position(|e| e.category() == category && e.topology() == TopologyKind::Start)
            .unwrap();
        events[start + 1..]
            .iter()
            .take_while(|e| e.topology() != TopologyKind::End)
            .filter(|e| e.category() == ContentCategory::SetElement)
            .map(|e| e.linked_id().unwrap())
            .collect()
    };

    // TAXSET members resolve by label to their OTU IDs
    assert_eq!(
        elements_of(ContentCategory::OtuSet),
        vec![otus["Kea"].as_str(), otus["Kakapo"].as_str()]
    );

    // TREESET positions resolve over declaration order
    let tree_ids: Vec<&str> = events
        .iter()
        .filter(|e| e.category() == ContentCategory::Tree && e.topology() == TopologyKind::Start)
        .map(|e| e.id().unwrap())
        .collect();
    assert_eq!(elements_of(ContentCategory::TreeNetworkSet), vec![tree_ids[0]]);
}

// --- TESTS WRITING AND ROUND TRIPS ---
#[test]
fn test_round_trip_preserves_structure() {
    let input = "#NEXUS\n\
                 BEGIN TAXA;\n\tDIMENSIONS NTAX=3;\n\tTAXLABELS Kea Kaka Kakapo;\nEND;\n\
                 BEGIN CHARACTERS;\n\tDIMENSIONS NCHAR=4;\n\
                 \tMATRIX\n\t\tKea ACGT\n\t\tKaka AC-T\n\t\tKakapo ?CGT\n\t;\nEND;\n\
                 BEGIN TREES;\n\
                 \tTRANSLATE 1 Kea, 2 Kaka, 3 Kakapo;\n\
                 \tTREE spine = ((1:1.0,2:1.0):0.5,3:1.5);\n\
                 END;\n";
    let params = ReadWriteParameterMap::default();
    let first = read_nexus_document(input, params.clone()).unwrap();
    let text = write_nexus_string(&first, params.clone()).unwrap();
    let second = read_nexus_document(&text, params).unwrap();

    assert_eq!(
        otu_labels(&second.stored_otu_lists()[0]),
        vec!["Kea", "Kaka", "Kakapo"]
    );
    for label in ["Kea", "Kaka", "Kakapo"] {
        assert_eq!(
            matrix_row(&first.stored_matrices()[0], label),
            matrix_row(&second.stored_matrices()[0], label)
        );
    }

    let first_trees = first.stored_tree_network_groups()[0].tree_networks();
    let second_trees = second.stored_tree_network_groups()[0].tree_networks();
    assert_eq!(first_trees.len(), 1);
    assert_eq!(second_trees.len(), 1);
    assert_eq!(first_trees[0].label(), Some("spine"));
    assert_eq!(second_trees[0].label(), Some("spine"));
    assert_eq!(
        sorted_edge_lengths(first_trees[0]),
        vec![0.5, 1.0, 1.0, 1.5]
    );
    assert_eq!(
        sorted_edge_lengths(first_trees[0]),
        sorted_edge_lengths(second_trees[0])
    );
}

#[test]
fn test_interleaved_writing_round_trip() {
    let input = "#NEXUS\n\
                 BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS A B; END;\n\
                 BEGIN CHARACTERS; DIMENSIONS NCHAR=8;\n\
                 MATRIX\n\
                 A ACGTACGT\n\
                 B TTTTGGGG\n\
                 ;\nEND;\n";
    let params = ReadWriteParameterMap::new().with_max_tokens_per_line(4);
    let first = read_nexus_document(input, params.clone()).unwrap();
    let text = write_nexus_string(&first, params.clone()).unwrap();

    // Eight columns at four tokens per line forces interleaving
    assert!(text.contains("FORMAT INTERLEAVE;"));
    assert!(text.contains("DIMENSIONS NTAX=2 NCHAR=8;"));

    let second = read_nexus_document(&text, params).unwrap();
    assert_eq!(matrix_row(&second.stored_matrices()[0], "A").concat(), "ACGTACGT");
    assert_eq!(matrix_row(&second.stored_matrices()[0], "B").concat(), "TTTTGGGG");
}

#[test]
fn test_full_stream_is_grammar_valid() {
    let events = read_nexus_events(
        "#NEXUS\n\
         BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS Kea Kaka; END;\n\
         BEGIN CHARACTERS;\n\
         DIMENSIONS NCHAR=4;\n\
         FORMAT DATATYPE=DNA MISSING=?;\n\
         MATRIX\nKea ACGT\nKaka AC?T\n;\nEND;\n\
         BEGIN TREES; TREE both = (Kea:1,Kaka:2); END;\n\
         BEGIN SETS; CHARSET stem = 1-2; TAXSET pair = Kea Kaka; END;\n\
         BEGIN ASSUMPTIONS; OPTIONS DEFTYPE=unord; END;\n",
    )
    .unwrap();

    let mut checker = GrammarChecker::new();
    for event in &events {
        checker.accept(event).unwrap();
    }
    assert!(checker.is_complete());
}
