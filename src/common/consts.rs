//! Constants of the crate.

/// Maximum number of features in a file template.
pub const max_features: usize = 255;

/// Use this macro to declare keywords.
///
/// Declares everything and creates a function testing if a string is a
/// keyword.
macro_rules! keys {
    // Create one keyword.
    (|internal def|
        $id:ident $def:expr, $doc:meta $(,$meta:meta)* $(,)*
    ) => (
        #[$doc]
        $(#[$meta])*
        pub const $id: &str = $def;
    );

    // Creates some keywords and some functions, if any.
    (
        keys {
            $( $id:ident ( $($stuff:tt)* ) )*
        }
        $(
            $doc:meta mod $mod:ident { $($mod_stuff:tt)* }
        )*
    ) => (
        #[doc = "
            True if input is one of the keywords defined in this module and its
            submodules.
        "]
        #[allow(dead_code)]
        pub fn is_keyword(s: &str) -> bool {
            $(
                if $id == s { return true }
            )*
            $(
                if $mod::is_keyword(s) { return true }
            )*
            false
        }
        $( keys! { |internal def| $id $($stuff)* } )*
        $(
            #[$doc]
            pub mod $mod { keys! { $($mod_stuff)* } }
        )*
    );
}

/// Reserved words and parameter names.
pub mod keywords {

    keys! {
        keys {
            padding ("ZZZ", doc = "Value of every column of padding samples.")
            fake_class (
                "FAKE_CLASS", doc = "Target of questions that never change the state."
            )
            unknown ("UNK", doc = "Unknown word.")
            implies ("=>", doc = "Separates predicates from targets.")
        }

        doc = "Keywords of rule and vocabulary files."
        mod file {
            keys {
                rule_prefix ("RULE:", doc = "Precedes the rule in rule files.")
                good ("GOOD:", doc = "Good count prefix.")
                bad ("BAD:", doc = "Bad count prefix.")
                score ("SCORE:", doc = "Score prefix.")
                train_voc (
                    "#train_voc_file:", doc = "Vocabulary file header of a rule file."
                )
                real_words (
                    "#real_word_indices:", doc = "Real word range of a vocabulary file."
                )
                num_classes (
                    "#number_of_classes:", doc = "Class count of a vocabulary file."
                )
                tree_rules ("Number_of_rules", doc = "Rule count of a tree file.")
                tree_classes ("Classes:", doc = "Class list of a tree file.")
            }
        }

        doc = "Parameter names."
        mod params {
            keys {
                file_template ("FILE_TEMPLATE", doc = "Header file.")
                rule_templates ("RULE_TEMPLATES", doc = "Rule template file.")
                empty_lines_sep (
                    "EMPTY_LINES_ARE_SEPARATORS", doc = "Blank lines separate sentences."
                )
                truth_sep ("TRUTH_SEPARATOR", doc = "Separates alternative truths.")
                constraints ("CONSTRAINTS_FILE", doc = "Constraint file.")
                cooc ("COOCCURRENCE_CONFIGURATION_FILE", doc = "Co-occurrence tables.")
                large_vocab ("LARGE_WORD_VOCABULARY", doc = "Extra real words.")
                dont_collapse ("DONT_COLLAPSE_SAMPLES", doc = "Keep duplicate samples.")
                collapsed_file ("COLLAPSED_CORPUS_FILE", doc = "Collapsed corpus dump.")
                elimination ("ELIMINATION_THRESHOLD", doc = "Initial good threshold.")
                erase_useless ("ERASE_USELESS_RULES", doc = "Bad ceiling of useless rules.")
                erase_factor (
                    "ERASE_RULES_WITH_USELESS_FACTOR", doc = "Good/bad eviction factor."
                )
                num_repeats ("NUM_REPEATS", doc = "Repeated best rule guard.")
                size_order ("ORDER_BASED_ON_SIZE", doc = "Size tie-break.")
                null_features ("NULL_FEATURES", doc = "Values feature sets ignore.")
                reasonable_split ("REASONABLE_SPLIT", doc = "Tree split minimum.")
                reasonable_dt_split ("REASONABLE_DT_SPLIT", doc = "Leaf split minimum.")
                min_gain ("MINIMUM_ENTROPY_GAIN", doc = "Leaf split minimum gain.")
                smoothing ("PROBABILITY_SMOOTHING_FACTOR", doc = "Additive smoothing.")
                env_fallback ("DDINF", doc = "Environment variable naming a parameter file.")
            }
        }
    }
}
