//! Format dispatch: descriptors, the format registry and the options bag.
//!
//! A [DataFormat] bundles up to four capabilities under a name:
//! * reader - reads a whole source into a [DataSet](crate::model::DataSet)
//! * writer - writes a whole data set
//! * tree source iterator - lazily yields the trees of a source
//! * tree list writer - writes a stand-alone [TreeList](crate::model::TreeList)
//!
//! A [FormatRegistry] maps case-insensitive names to descriptors. Besides
//! explicitly constructed registries there is one process-wide default
//! registry behind the functions at the crate root, see [crate::init].

mod format;
pub mod options;
mod registry;

pub use self::format::{
    DataFormat, DataReader, DataWriter, ReaderFactory, TreeListWriterFactory, TreeSourceIter,
    TreeSourceIterFactory, WriterFactory,
};
pub use self::options::{FormatOptions, OptionValue, PRESERVE_UNDERSCORES, TRANSLATE};
pub use self::registry::FormatRegistry;

pub(crate) use self::registry::{read_default, write_default};
